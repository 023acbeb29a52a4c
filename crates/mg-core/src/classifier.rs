//! Bayesian classifier over a set of gesture models.
//!
//! Each model's prior is its default probability and its likelihood is the
//! HMM probability of the quantized gesture. The winner is the model with the
//! largest normalized posterior `prior * likelihood / sum`. A match is only
//! reported when that posterior, the winner's prior and the winner's
//! likelihood are all positive and the normalizer is positive.

use mg_common::{Gesture, ModelId};
use mg_math::argmax_first;
use serde::Serialize;
use thiserror::Error;

use crate::model::{GestureModel, ModelError};

/// Classifier errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("model {index} ({name}) could not score the gesture: {source}")]
    Model {
        index: usize,
        name: String,
        #[source]
        source: ModelError,
    },
}

impl From<ClassifierError> for mg_common::Error {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Model { source, .. } => source.into(),
        }
    }
}

/// A successful classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Position of the winning model in the classifier.
    pub index: usize,
    pub model_id: ModelId,
    pub name: String,
    /// Normalized posterior of the winner.
    pub probability: f64,
    pub likelihood: f64,
    pub prior: f64,
}

/// Ordered collection of gesture models.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    models: Vec<GestureModel>,
    last_probability: f64,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a model and return it.
    pub fn add(&mut self, model: GestureModel) -> &mut GestureModel {
        let index = self.models.len();
        self.models.push(model);
        &mut self.models[index]
    }

    pub fn get(&self, index: usize) -> Option<&GestureModel> {
        self.models.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut GestureModel> {
        self.models.get_mut(index)
    }

    pub fn find(&self, id: &ModelId) -> Option<&GestureModel> {
        self.models.iter().find(|m| m.id() == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&GestureModel> {
        self.models.iter().find(|m| m.name() == name)
    }

    /// Remove a model by id, keeping the order of the rest.
    pub fn remove(&mut self, id: &ModelId) -> Option<GestureModel> {
        let index = self.models.iter().position(|m| m.id() == id)?;
        Some(self.models.remove(index))
    }

    pub fn models(&self) -> &[GestureModel] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&mut self) {
        self.models.clear();
        self.last_probability = 0.0;
    }

    /// Posterior of the most recent classification; 0 after a miss.
    pub fn last_probability(&self) -> f64 {
        self.last_probability
    }

    /// Pick the most probable model for `gesture`.
    ///
    /// `Ok(None)` means no model qualified. With no models this is always a
    /// miss. Ties keep the earlier model.
    pub fn classify(
        &mut self,
        gesture: &Gesture,
    ) -> Result<Option<Classification>, ClassifierError> {
        let mut scores = Vec::with_capacity(self.models.len());
        let mut sum = 0.0;
        for (index, model) in self.models.iter().enumerate() {
            let prior = model.default_probability();
            let likelihood =
                model
                    .match_probability(gesture)
                    .map_err(|source| ClassifierError::Model {
                        index,
                        name: model.name().to_string(),
                        source,
                    })?;
            sum += prior * likelihood;
            scores.push((prior, likelihood));
        }

        // 0/0 posteriors are NaN and never win.
        let posteriors: Vec<f64> = scores
            .iter()
            .map(|&(prior, likelihood)| prior * likelihood / sum)
            .collect();

        let hit = argmax_first(&posteriors).filter(|&i| {
            let (prior, likelihood) = scores[i];
            posteriors[i] > 0.0 && prior > 0.0 && likelihood > 0.0 && sum > 0.0
        });

        match hit {
            Some(index) => {
                let (prior, likelihood) = scores[index];
                let best_posterior = posteriors[index];
                let model = &self.models[index];
                self.last_probability = best_posterior;
                tracing::debug!(
                    model = %model.id(),
                    name = model.name(),
                    posterior = best_posterior,
                    candidates = self.models.len(),
                    "gesture classified"
                );
                Ok(Some(Classification {
                    index,
                    model_id: model.id().clone(),
                    name: model.name().to_string(),
                    probability: best_posterior,
                    likelihood,
                    prior,
                }))
            }
            None => {
                self.last_probability = 0.0;
                tracing::debug!(candidates = self.models.len(), sum, "no model matched");
                Ok(None)
            }
        }
    }
}
