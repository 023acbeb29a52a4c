//! Capture, training and recognition state machine.
//!
//! A [`ProcessingUnit`] owns a filter chain, a classifier and the sample
//! buffers. Samples pushed with [`ProcessingUnit::add_data`] run through the
//! chain and are buffered only while learning or analyzing. Commands that do
//! not apply to the current state are ignored.
//!
//! Everything runs synchronously on the caller's thread. Recognition
//! listeners are invoked from inside [`ProcessingUnit::stop_recognition`].

use std::sync::Arc;

use mg_common::{Gesture, Sample};
use mg_config::recognizer::default_filters;
use mg_config::{ModelConfig, RecognizerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::{Classification, Classifier, ClassifierError};
use crate::filter::{Clock, Filter, FilterChain};
use crate::logging::{event_names, Stage};
use crate::model::{GestureModel, ModelError};

/// Processing unit errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("training session failed: {0}")]
    Training(#[from] ModelError),

    #[error("recognition failed: {0}")]
    Recognition(#[from] ClassifierError),
}

impl From<ProcessingError> for mg_common::Error {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Training(e) => e.into(),
            ProcessingError::Recognition(e) => e.into(),
        }
    }
}

/// Mutually exclusive unit states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Idle,
    Learning,
    Analyzing,
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingState::Idle => write!(f, "idle"),
            ProcessingState::Learning => write!(f, "learning"),
            ProcessingState::Analyzing => write!(f, "analyzing"),
        }
    }
}

/// Result handed to listeners when a recognition finishes.
///
/// `model` is `None` and `probability` is 0 when nothing matched.
#[derive(Debug, Clone, Copy)]
pub struct RecognitionEvent<'a> {
    pub model: Option<&'a GestureModel>,
    pub probability: f64,
}

/// Receives recognition results.
pub trait RecognitionListener: Send {
    fn on_recognition(&mut self, event: &RecognitionEvent<'_>);
}

impl<F> RecognitionListener for F
where
    F: FnMut(&RecognitionEvent<'_>) + Send,
{
    fn on_recognition(&mut self, event: &RecognitionEvent<'_>) {
        self(event)
    }
}

/// What one `stop_recognition` call produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionOutcome {
    /// Samples in the classified gesture.
    pub samples: usize,
    pub classification: Option<Classification>,
}

impl RecognitionOutcome {
    /// Posterior of the match, 0 for a miss.
    pub fn probability(&self) -> f64 {
        self.classification
            .as_ref()
            .map(|c| c.probability)
            .unwrap_or(0.0)
    }
}

/// Gesture capture, training and recognition driver.
pub struct ProcessingUnit {
    chain: FilterChain,
    clock: Arc<dyn Clock>,
    model_config: ModelConfig,
    classifier: Classifier,
    state: ProcessingState,
    current: Gesture,
    pending: Vec<Gesture>,
    listeners: Vec<Box<dyn RecognitionListener>>,
}

impl ProcessingUnit {
    /// Unit with the configured filter chain and model constants.
    pub fn new(config: &RecognizerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            chain: FilterChain::from_specs(&config.filters, Arc::clone(&clock)),
            clock,
            model_config: config.model.clone(),
            classifier: Classifier::new(),
            state: ProcessingState::Idle,
            current: Gesture::new(),
            pending: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Unit with the stock idle/motion/directional chain and default model
    /// constants.
    pub fn with_default_filters(clock: Arc<dyn Clock>) -> Self {
        let config = RecognizerConfig {
            filters: default_filters(),
            ..RecognizerConfig::default()
        };
        Self::new(&config, clock)
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn is_learning(&self) -> bool {
        self.state == ProcessingState::Learning
    }

    pub fn is_analyzing(&self) -> bool {
        self.state == ProcessingState::Analyzing
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut Classifier {
        &mut self.classifier
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    /// Finished training examples waiting for `finish_training_session`.
    pub fn pending_examples(&self) -> &[Gesture] {
        &self.pending
    }

    /// Samples captured since the current learning or analyzing phase began.
    pub fn buffered_samples(&self) -> &Gesture {
        &self.current
    }

    /// Motion flag of the chain's motion detector, if it has one.
    pub fn motion_status(&self) -> Option<bool> {
        self.chain.motion_status()
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: RecognitionListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Append a filter to the end of the chain.
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.chain.push(filter);
    }

    /// Append a filter built from configuration on this unit's clock.
    pub fn add_filter_spec(&mut self, spec: &mg_config::FilterSpec) {
        self.chain
            .push(crate::filter::build_filter(spec, Arc::clone(&self.clock)));
    }

    pub fn reset_filters(&mut self) {
        self.chain.reset();
    }

    pub fn clear_filters(&mut self) {
        self.chain.clear();
    }

    /// Forget every trained model.
    pub fn reset(&mut self) {
        let dropped = self.classifier.len();
        self.classifier.clear();
        tracing::debug!(models = dropped, "classifier reset");
    }

    /// Push one sensor sample. Returns true if it was buffered.
    pub fn add_data(&mut self, sample: Sample) -> bool {
        let Some(filtered) = self.chain.process(sample) else {
            return false;
        };
        if self.state == ProcessingState::Idle {
            return false;
        }
        self.current.add(filtered);
        true
    }

    pub fn start_training(&mut self) {
        self.enter(ProcessingState::Learning, "start_training");
    }

    /// Move the current buffer into the pending examples and go idle.
    pub fn stop_training(&mut self) {
        if self.state != ProcessingState::Learning {
            self.ignored("stop_training");
            return;
        }
        if self.current.is_empty() {
            tracing::debug!(
                target: event_names::CAPTURE_DISCARDED,
                stage = %Stage::Capture,
                "training capture ended with no samples"
            );
        } else {
            let example = std::mem::take(&mut self.current);
            tracing::debug!(
                target: event_names::CAPTURE_STOPPED,
                stage = %Stage::Capture,
                samples = example.len(),
                pending = self.pending.len() + 1,
                "training example captured"
            );
            self.pending.push(example);
        }
        self.state = ProcessingState::Idle;
    }

    /// Train a new model from every pending example and register it.
    ///
    /// `Ok(None)` unless the unit is idle with at least one pending example.
    /// On failure the pending examples are kept.
    pub fn finish_training_session(
        &mut self,
    ) -> Result<Option<&mut GestureModel>, ProcessingError> {
        if self.state != ProcessingState::Idle || self.pending.is_empty() {
            self.ignored("finish_training_session");
            return Ok(None);
        }

        tracing::debug!(
            target: event_names::TRAIN_STARTED,
            stage = %Stage::Train,
            examples = self.pending.len(),
            "training gesture model"
        );

        let mut model = GestureModel::new(&self.model_config)?;
        if let Err(e) = model.train(&self.pending) {
            tracing::warn!(
                target: event_names::TRAIN_FAILED,
                stage = %Stage::Train,
                examples = self.pending.len(),
                error = %e,
                "training failed; pending examples kept"
            );
            return Err(e.into());
        }

        tracing::debug!(
            target: event_names::TRAIN_FINISHED,
            stage = %Stage::Train,
            model = %model.id(),
            examples = self.pending.len(),
            prior = model.default_probability(),
            "gesture model registered"
        );
        self.pending.clear();
        Ok(Some(self.classifier.add(model)))
    }

    pub fn start_recognition(&mut self) {
        self.enter(ProcessingState::Analyzing, "start_recognition");
    }

    /// Classify the buffered gesture, notify listeners and go idle.
    ///
    /// Returns `Ok(None)` without notifying anyone when not analyzing or when
    /// nothing was buffered. If a model fails to score the gesture, listeners
    /// still receive a miss and the error is returned.
    pub fn stop_recognition(&mut self) -> Result<Option<RecognitionOutcome>, ProcessingError> {
        if self.state != ProcessingState::Analyzing {
            self.ignored("stop_recognition");
            return Ok(None);
        }
        self.state = ProcessingState::Idle;

        if self.current.is_empty() {
            tracing::debug!(
                target: event_names::CAPTURE_DISCARDED,
                stage = %Stage::Recognize,
                "recognition capture ended with no samples"
            );
            return Ok(None);
        }

        let gesture = std::mem::take(&mut self.current);
        let result = self.classifier.classify(&gesture);

        let classification = match &result {
            Ok(c) => c.clone(),
            Err(_) => None,
        };
        let model = classification
            .as_ref()
            .and_then(|c| self.classifier.get(c.index));
        let event = RecognitionEvent {
            model,
            probability: classification.as_ref().map(|c| c.probability).unwrap_or(0.0),
        };
        for listener in &mut self.listeners {
            listener.on_recognition(&event);
        }

        tracing::debug!(
            target: event_names::RECOGNIZE_FINISHED,
            stage = %Stage::Recognize,
            samples = gesture.len(),
            matched = model.map(GestureModel::name).unwrap_or_default(),
            probability = event.probability,
            "recognition finished"
        );

        result?;
        Ok(Some(RecognitionOutcome {
            samples: gesture.len(),
            classification,
        }))
    }

    fn enter(&mut self, target: ProcessingState, command: &'static str) {
        if self.state != ProcessingState::Idle {
            self.ignored(command);
            return;
        }
        self.state = target;
        let (event, stage) = match target {
            ProcessingState::Analyzing => (event_names::RECOGNIZE_STARTED, Stage::Recognize),
            _ => (event_names::CAPTURE_STARTED, Stage::Capture),
        };
        tracing::debug!(event, stage = %stage, state = %target, "state changed");
    }

    fn ignored(&self, command: &'static str) {
        tracing::trace!(command, state = %self.state, "command ignored in current state");
    }
}

impl std::fmt::Debug for ProcessingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingUnit")
            .field("state", &self.state)
            .field("chain", &self.chain)
            .field("models", &self.classifier.len())
            .field("buffered", &self.current.len())
            .field("pending", &self.pending.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ManualClock;
    use crate::test_utils::{circle, feed, line, unfiltered_unit};
    use std::sync::Mutex;

    fn record(unit: &mut ProcessingUnit) -> Arc<Mutex<Vec<(Option<String>, f64)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        unit.add_listener(move |e: &RecognitionEvent<'_>| {
            sink.lock()
                .unwrap()
                .push((e.model.map(|m| m.name().to_string()), e.probability));
        });
        seen
    }

    fn train(unit: &mut ProcessingUnit, clock: &ManualClock, name: &str, examples: &[Gesture]) {
        for g in examples {
            unit.start_training();
            feed(unit, clock, g, 10);
            unit.stop_training();
        }
        let model = unit.finish_training_session().unwrap().unwrap();
        model.set_name(name);
    }

    #[test]
    fn idle_samples_are_discarded() {
        let (mut unit, _clock) = unfiltered_unit();
        assert_eq!(unit.state(), ProcessingState::Idle);
        assert!(!unit.add_data(Sample::new(1.0, 0.0, 0.0)));
        assert!(unit.buffered_samples().is_empty());
    }

    #[test]
    fn training_capture_moves_to_pending() {
        let (mut unit, clock) = unfiltered_unit();
        unit.start_training();
        assert!(unit.is_learning());
        feed(&mut unit, &clock, &circle(12, 1.0), 10);
        assert_eq!(unit.buffered_samples().len(), 12);

        unit.stop_training();
        assert_eq!(unit.state(), ProcessingState::Idle);
        assert!(unit.buffered_samples().is_empty());
        assert_eq!(unit.pending_examples().len(), 1);
        assert_eq!(unit.pending_examples()[0].len(), 12);
    }

    #[test]
    fn empty_training_capture_adds_nothing() {
        let (mut unit, _clock) = unfiltered_unit();
        unit.start_training();
        unit.stop_training();
        assert!(unit.pending_examples().is_empty());
        assert_eq!(unit.finish_training_session().unwrap().map(|m| m.id().clone()), None);
    }

    #[test]
    fn commands_in_wrong_state_are_ignored() {
        let (mut unit, clock) = unfiltered_unit();
        unit.stop_training();
        assert_eq!(unit.stop_recognition().unwrap(), None);

        unit.start_training();
        feed(&mut unit, &clock, &line(5, 1.0), 10);
        unit.start_recognition();
        unit.start_training();
        assert!(unit.is_learning());
        assert_eq!(unit.stop_recognition().unwrap(), None);
        assert!(unit.finish_training_session().unwrap().is_none());
        assert_eq!(unit.buffered_samples().len(), 5);
    }

    #[test]
    fn finish_training_registers_model() {
        let (mut unit, clock) = unfiltered_unit();
        train(&mut unit, &clock, "circle", &[circle(30, 1.0), circle(30, 1.0)]);
        assert_eq!(unit.classifier().len(), 1);
        assert!(unit.pending_examples().is_empty());
        assert_eq!(unit.classifier().models()[0].name(), "circle");
        assert_eq!(unit.classifier().models()[0].training_examples(), 2);
    }

    #[test]
    fn recognition_notifies_listener_once() {
        let (mut unit, clock) = unfiltered_unit();
        train(&mut unit, &clock, "circle", &[circle(30, 1.0), circle(30, 1.0)]);
        let seen = record(&mut unit);

        unit.start_recognition();
        feed(&mut unit, &clock, &circle(30, 1.0), 10);
        let outcome = unit.stop_recognition().unwrap().unwrap();

        assert_eq!(outcome.samples, 30);
        assert!((outcome.probability() - 1.0).abs() < 1e-12);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("circle"));
        assert_eq!(unit.state(), ProcessingState::Idle);
        assert!(unit.buffered_samples().is_empty());
    }

    #[test]
    fn miss_notifies_with_zero() {
        let (mut unit, clock) = unfiltered_unit();
        let seen = record(&mut unit);
        unit.start_recognition();
        feed(&mut unit, &clock, &circle(10, 1.0), 10);
        let outcome = unit.stop_recognition().unwrap().unwrap();
        assert_eq!(outcome.classification, None);
        assert_eq!(*seen.lock().unwrap(), vec![(None, 0.0)]);
    }

    #[test]
    fn empty_recognition_does_not_notify() {
        let (mut unit, _clock) = unfiltered_unit();
        let seen = record(&mut unit);
        unit.start_recognition();
        assert_eq!(unit.stop_recognition().unwrap(), None);
        assert_eq!(unit.state(), ProcessingState::Idle);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn reset_forgets_models_only() {
        let (mut unit, clock) = unfiltered_unit();
        train(&mut unit, &clock, "line", &[line(20, 1.0)]);
        unit.start_training();
        feed(&mut unit, &clock, &line(3, 1.0), 10);
        unit.reset();
        assert!(unit.classifier().is_empty());
        assert!(unit.is_learning());
        assert_eq!(unit.buffered_samples().len(), 3);
    }

    #[test]
    fn default_filters_gate_capture() {
        let clock = ManualClock::new(0);
        let mut unit = ProcessingUnit::with_default_filters(Arc::new(clock.clone()));
        assert_eq!(
            unit.filter_names(),
            vec!["idle_state", "motion_detect", "directional_equivalence"]
        );
        unit.start_training();
        assert!(!unit.add_data(Sample::new(0.01, 0.0, 0.0)));
        assert!(unit.add_data(Sample::new(1.0, 0.0, 0.0)));
        assert_eq!(unit.motion_status(), Some(true));
        clock.advance(500);
        assert!(!unit.add_data(Sample::new(0.0, 0.0, 0.0)));
        assert_eq!(unit.motion_status(), Some(false));

        unit.clear_filters();
        assert!(unit.add_data(Sample::new(0.0, 0.0, 0.0)));
        assert_eq!(unit.motion_status(), None);
    }
}
