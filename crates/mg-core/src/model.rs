//! Trained gesture models: one quantizer plus one HMM per gesture class.

use mg_common::{Gesture, ModelId};
use mg_config::ModelConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hmm::{HiddenMarkovModel, HmmError};
use crate::quantizer::{KMeansReport, Quantizer, QuantizerError};

/// Gesture model errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("no training gestures supplied")]
    NoTrainingData,

    #[error("training gesture {index} has no samples")]
    EmptyGesture { index: usize },

    #[error(transparent)]
    Quantizer(#[from] QuantizerError),

    #[error(transparent)]
    Hmm(#[from] HmmError),
}

impl From<ModelError> for mg_common::Error {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NoTrainingData => {
                mg_common::Error::Training("no training gestures supplied".to_string())
            }
            ModelError::EmptyGesture { .. } => mg_common::Error::EmptyGesture,
            ModelError::Quantizer(e) => e.into(),
            ModelError::Hmm(e) => e.into(),
        }
    }
}

/// What a training run did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    pub examples: usize,
    pub kmeans: KMeansReport,
    pub default_probability: f64,
}

/// Serializable description of a model for CLI output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: ModelId,
    pub name: String,
    pub default_probability: f64,
    pub training_examples: usize,
    pub states: usize,
    pub observations: usize,
    pub radius: f64,
}

/// Recognizer for exactly one gesture class.
#[derive(Debug, Clone)]
pub struct GestureModel {
    id: ModelId,
    name: String,
    quantizer: Quantizer,
    hmm: HiddenMarkovModel,
    default_probability: f64,
    training_examples: usize,
}

impl GestureModel {
    /// Untrained model sized by `config`.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let hmm = HiddenMarkovModel::with_jump_limit(
            config.states,
            config.observations,
            config.jump_limit,
        )?;
        let id = ModelId::new();
        Ok(Self {
            name: id.to_string(),
            id,
            quantizer: Quantizer::with_max_iterations(config.states, config.kmeans_max_iterations),
            hmm,
            default_probability: 0.0,
            training_examples: 0,
        })
    }

    pub fn id(&self) -> &ModelId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Prior used by the classifier.
    pub fn default_probability(&self) -> f64 {
        self.default_probability
    }

    pub fn set_default_probability(&mut self, prob: f64) {
        self.default_probability = prob;
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn hmm(&self) -> &HiddenMarkovModel {
        &self.hmm
    }

    pub fn training_examples(&self) -> usize {
        self.training_examples
    }

    pub fn is_trained(&self) -> bool {
        self.quantizer.is_trained()
    }

    /// Train on several performances of the same gesture.
    ///
    /// All samples are pooled into one aggregate gesture whose extremes are
    /// the per-gesture averages; the codebook is fitted to that aggregate.
    /// Each example is then quantized on its own and the HMM is trained on
    /// the resulting sequences. The prior becomes the mean likelihood of
    /// the examples under the new model.
    ///
    /// On error the model is left as it was.
    pub fn train(&mut self, gestures: &[Gesture]) -> Result<TrainingReport, ModelError> {
        if gestures.is_empty() {
            return Err(ModelError::NoTrainingData);
        }
        if let Some(index) = gestures.iter().position(Gesture::is_empty) {
            return Err(ModelError::EmptyGesture { index });
        }

        let count = gestures.len() as f64;
        let mut max_acc = 0.0;
        let mut min_acc = 0.0;
        let mut aggregate = Gesture::new();
        for gesture in gestures {
            max_acc += gesture.max_acceleration();
            min_acc += gesture.min_acceleration();
            for sample in gesture.samples() {
                aggregate.add(*sample);
            }
        }
        aggregate.set_max_and_min_acceleration(max_acc / count, min_acc / count);

        let mut quantizer = self.quantizer.clone();
        let kmeans = quantizer.train_centroids(&aggregate)?;

        let sequences = gestures
            .iter()
            .map(|g| quantizer.observation_sequence(g))
            .collect::<Result<Vec<_>, _>>()?;

        let mut hmm = self.hmm.clone();
        hmm.train(&sequences)?;

        let mut total = 0.0;
        for seq in &sequences {
            total += hmm.probability(seq)?;
        }
        let default_probability = total / count;

        self.quantizer = quantizer;
        self.hmm = hmm;
        self.default_probability = default_probability;
        self.training_examples = gestures.len();

        tracing::debug!(
            model = %self.id,
            examples = gestures.len(),
            samples = aggregate.len(),
            kmeans_iterations = kmeans.iterations,
            prior = default_probability,
            "gesture model trained"
        );

        Ok(TrainingReport {
            examples: gestures.len(),
            kmeans,
            default_probability,
        })
    }

    /// Likelihood of `gesture` under this model.
    pub fn match_probability(&self, gesture: &Gesture) -> Result<f64, ModelError> {
        let sequence = self.quantizer.observation_sequence(gesture)?;
        Ok(self.hmm.probability(&sequence)?)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            default_probability: self.default_probability,
            training_examples: self.training_examples,
            states: self.hmm.states(),
            observations: self.hmm.observations(),
            radius: self.quantizer.radius(),
        }
    }
}
