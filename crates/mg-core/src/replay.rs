//! Drive a processing unit from recorded data.
//!
//! A session script is JSONL, one step per line:
//!
//! ```text
//! {"cmd":"start_training"}
//! {"sample":[0.4,-1.2,0.1]}
//! {"sample":[0.6,-1.0,0.2],"t":1030}
//! {"cmd":"stop_training"}
//! {"cmd":"finish_training","name":"circle"}
//! {"cmd":"start_recognition"}
//! ...
//! {"cmd":"stop_recognition"}
//! ```
//!
//! Time runs on a manual clock. A sample with `t` sets the clock to that
//! millisecond; otherwise the clock advances by the tick before each sample.
//! Blank lines and lines starting with `#` are skipped.

use std::io::BufRead;
use std::sync::Arc;

use mg_common::{Gesture, Sample};
use mg_config::RecognizerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{record_names, RecordEmitter, SessionRecord};
use crate::filter::ManualClock;
use crate::logging::{event_names, Stage};
use crate::model::ModelSummary;
use crate::processing::{ProcessingError, ProcessingUnit, RecognitionOutcome};

/// Default clock step between samples without a timestamp.
pub const DEFAULT_TICK_MS: u64 = 10;

/// Replay errors. Training and recognition failures are reported as records
/// and do not stop a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: sample has a NaN or infinite component")]
    NonFiniteSample { line: usize },

    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ReplayError> for mg_common::Error {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::Io(e) => mg_common::Error::Io(e),
            ReplayError::NonFiniteSample { line } => mg_common::Error::InvalidSample {
                index: line,
                reason: "component is NaN or infinite".to_string(),
            },
            ReplayError::Parse { .. } => mg_common::Error::InvalidInput(err.to_string()),
        }
    }
}

/// A processing unit command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    StartTraining,
    StopTraining,
    FinishTraining {
        #[serde(default)]
        name: Option<String>,
    },
    StartRecognition,
    StopRecognition,
    /// Forget every trained model.
    Reset,
    ResetFilters,
}

/// One script line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Command(Command),
    Sample {
        sample: Sample,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        t: Option<u64>,
    },
}

/// Parse one script line. `Ok(None)` for blank and comment lines.
pub fn parse_step(line: &str, lineno: usize) -> Result<Option<Step>, ReplayError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let step: Step = serde_json::from_str(trimmed).map_err(|e| ReplayError::Parse {
        line: lineno,
        message: format!("not a command or sample: {e}"),
    })?;
    if let Step::Sample { sample, .. } = &step {
        if !sample.is_finite() {
            return Err(ReplayError::NonFiniteSample { line: lineno });
        }
    }
    Ok(Some(step))
}

/// Totals for a finished replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub steps: usize,
    pub samples: usize,
    pub buffered: usize,
    pub recognitions: usize,
    pub matches: usize,
    pub training_failures: usize,
    pub recognition_failures: usize,
    pub models: Vec<ModelSummary>,
}

/// Executes script steps against a processing unit.
pub struct Replayer {
    unit: ProcessingUnit,
    clock: ManualClock,
    tick_ms: u64,
    emitter: Arc<dyn RecordEmitter>,
    summary: ReplaySummary,
}

impl Replayer {
    pub fn new(config: &RecognizerConfig, tick_ms: u64, emitter: Arc<dyn RecordEmitter>) -> Self {
        let clock = ManualClock::new(0);
        let unit = ProcessingUnit::new(config, Arc::new(clock.clone()));
        Self {
            unit,
            clock,
            tick_ms,
            emitter,
            summary: ReplaySummary::default(),
        }
    }

    pub fn unit(&self) -> &ProcessingUnit {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut ProcessingUnit {
        &mut self.unit
    }

    /// Apply one step. `step_no` is echoed in emitted records.
    pub fn apply(&mut self, step: Step, step_no: usize) {
        self.summary.steps += 1;
        match step {
            Step::Sample { sample, t } => {
                match t {
                    Some(t) => self.clock.set(t),
                    None => self.clock.advance(self.tick_ms),
                }
                self.summary.samples += 1;
                if self.unit.add_data(sample) {
                    self.summary.buffered += 1;
                }
            }
            Step::Command(cmd) => self.command(cmd, step_no),
        }
    }

    /// Feed every sample of `gesture`, advancing the clock by the tick.
    pub fn feed(&mut self, gesture: &Gesture) {
        for sample in gesture.samples() {
            self.apply(
                Step::Sample {
                    sample: *sample,
                    t: None,
                },
                0,
            );
        }
    }

    fn command(&mut self, cmd: Command, step_no: usize) {
        match cmd {
            Command::StartTraining => self.unit.start_training(),
            Command::StopTraining => self.unit.stop_training(),
            Command::StartRecognition => self.unit.start_recognition(),
            Command::FinishTraining { name } => self.finish_training(name, step_no),
            Command::StopRecognition => {
                let result = self.unit.stop_recognition();
                self.recognition_finished(result, step_no);
            }
            Command::Reset => {
                self.unit.reset();
                self.emitter
                    .emit(SessionRecord::new(record_names::MODELS_RESET).with_step(step_no));
            }
            Command::ResetFilters => self.unit.reset_filters(),
        }
    }

    fn finish_training(&mut self, name: Option<String>, step_no: usize) {
        match self.unit.finish_training_session() {
            Ok(Some(model)) => {
                if let Some(name) = name {
                    model.set_name(name);
                }
                let summary = model.summary();
                self.emitter
                    .emit(SessionRecord::trained(&summary).with_step(step_no));
            }
            Ok(None) => {}
            Err(e) => {
                self.summary.training_failures += 1;
                let mut record = SessionRecord::new(record_names::TRAINING_FAILED)
                    .with_step(step_no)
                    .with_detail("error", e.to_string());
                if let Some(name) = name {
                    record = record.with_name(name);
                }
                self.emitter.emit(record);
            }
        }
    }

    /// Record the result of a `stop_recognition` call made on this unit.
    pub fn recognition_finished(
        &mut self,
        result: Result<Option<RecognitionOutcome>, ProcessingError>,
        step_no: usize,
    ) -> Option<RecognitionOutcome> {
        match result {
            Ok(Some(outcome)) => {
                self.summary.recognitions += 1;
                if outcome.classification.is_some() {
                    self.summary.matches += 1;
                }
                self.emitter.emit(
                    SessionRecord::recognition(outcome.classification.as_ref(), outcome.samples)
                        .with_step(step_no),
                );
                Some(outcome)
            }
            Ok(None) => None,
            Err(e) => {
                self.summary.recognitions += 1;
                self.summary.recognition_failures += 1;
                self.emitter.emit(
                    SessionRecord::new(record_names::RECOGNITION_FAILED)
                        .with_step(step_no)
                        .with_detail("error", e.to_string()),
                );
                None
            }
        }
    }

    /// Run a whole script. Stops at the first unparseable line.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<(), ReplayError> {
        for (index, line) in reader.lines().enumerate() {
            let lineno = index + 1;
            let line = line?;
            if let Some(step) = parse_step(&line, lineno)? {
                self.apply(step, lineno);
            }
        }
        tracing::debug!(
            target: event_names::RUN_FINISHED,
            stage = %Stage::Replay,
            steps = self.summary.steps,
            recognitions = self.summary.recognitions,
            "script finished"
        );
        Ok(())
    }

    /// Totals so far, with a summary of every registered model.
    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            models: self
                .unit
                .classifier()
                .models()
                .iter()
                .map(|m| m.summary())
                .collect(),
            ..self.summary.clone()
        }
    }
}

/// Replay a script from `reader` with a fresh unit built from `config`.
pub fn replay_script<R: BufRead>(
    reader: R,
    config: &RecognizerConfig,
    tick_ms: u64,
    emitter: Arc<dyn RecordEmitter>,
) -> Result<ReplaySummary, ReplayError> {
    let mut replayer = Replayer::new(config, tick_ms, emitter);
    replayer.run(reader)?;
    Ok(replayer.summary())
}

/// Named training set for [`evaluate`].
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub name: String,
    pub examples: Vec<Gesture>,
}

/// Classification of one probe in [`evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub probe: usize,
    /// Samples that survived the filter chain.
    pub samples: usize,
    pub matched: Option<String>,
    pub probability: f64,
}

/// Results of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub models: Vec<ModelSummary>,
    pub probes: Vec<ProbeResult>,
    pub training_failures: usize,
}

/// Train one model per training set, then recognize every probe, all through
/// a processing unit so the configured filters apply.
///
/// Probes that leave nothing after filtering are reported as misses with zero
/// samples.
pub fn evaluate(
    config: &RecognizerConfig,
    tick_ms: u64,
    training: &[TrainingSet],
    probes: &[Gesture],
    emitter: Arc<dyn RecordEmitter>,
) -> Evaluation {
    let mut replayer = Replayer::new(config, tick_ms, emitter);

    for set in training {
        for example in &set.examples {
            replayer.command(Command::StartTraining, 0);
            replayer.unit_mut().reset_filters();
            replayer.feed(example);
            replayer.command(Command::StopTraining, 0);
        }
        replayer.finish_training(Some(set.name.clone()), 0);
    }

    let mut results = Vec::with_capacity(probes.len());
    for (index, probe) in probes.iter().enumerate() {
        replayer.command(Command::StartRecognition, index);
        replayer.unit_mut().reset_filters();
        replayer.feed(probe);
        let result = replayer.unit_mut().stop_recognition();
        let outcome = replayer.recognition_finished(result, index);
        let classification = outcome.as_ref().and_then(|o| o.classification.as_ref());
        results.push(ProbeResult {
            probe: index,
            samples: outcome.as_ref().map(|o| o.samples).unwrap_or(0),
            matched: classification.map(|c| c.name.clone()),
            probability: classification.map(|c| c.probability).unwrap_or(0.0),
        });
    }

    let summary = replayer.summary();
    Evaluation {
        models: summary.models,
        probes: results,
        training_failures: summary.training_failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::test_utils::{circle, line};
    use std::io::Cursor;

    fn raw_config() -> RecognizerConfig {
        RecognizerConfig {
            filters: Vec::new(),
            ..RecognizerConfig::default()
        }
    }

    fn script_for(gesture: &Gesture, open: &str, close: &str) -> String {
        let mut s = format!("{{\"cmd\":\"{open}\"}}\n");
        for sample in gesture.samples() {
            s.push_str(&format!(
                "{{\"sample\":[{},{},{}]}}\n",
                sample.x(),
                sample.y(),
                sample.z()
            ));
        }
        s.push_str(&format!("{{\"cmd\":\"{close}\"}}\n"));
        s
    }

    #[test]
    fn parses_commands_and_samples() {
        assert_eq!(
            parse_step(r#"{"cmd":"start_training"}"#, 1).unwrap(),
            Some(Step::Command(Command::StartTraining))
        );
        assert_eq!(
            parse_step(r#"{"cmd":"finish_training","name":"wave"}"#, 1).unwrap(),
            Some(Step::Command(Command::FinishTraining {
                name: Some("wave".to_string())
            }))
        );
        assert_eq!(
            parse_step(r#"{"sample":[1,2,3],"t":40}"#, 1).unwrap(),
            Some(Step::Sample {
                sample: Sample::new(1.0, 2.0, 3.0),
                t: Some(40)
            })
        );
        assert_eq!(parse_step("  # note", 3).unwrap(), None);
        assert_eq!(parse_step("", 4).unwrap(), None);
    }

    #[test]
    fn rejects_unknown_lines() {
        let err = parse_step(r#"{"cmd":"dance"}"#, 5).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 5, .. }));
        let err = parse_step(r#"{"sample":[1,2]}"#, 6).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 6, .. }));
    }

    #[test]
    fn full_session_emits_records() {
        let mut script = String::new();
        for _ in 0..2 {
            script.push_str(&script_for(&circle(30, 1.0), "start_training", "stop_training"));
        }
        script.push_str("{\"cmd\":\"finish_training\",\"name\":\"circle\"}\n");
        script.push_str(&script_for(&circle(30, 1.0), "start_recognition", "stop_recognition"));

        let bus = Arc::new(EventBus::new());
        let rx = bus.subscribe();
        let summary = replay_script(Cursor::new(script), &raw_config(), 10, bus).unwrap();

        assert_eq!(summary.models.len(), 1);
        assert_eq!(summary.models[0].name, "circle");
        assert_eq!(summary.recognitions, 1);
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.samples, 90);

        let records: Vec<_> = rx.try_iter().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record, record_names::MODEL_TRAINED);
        assert_eq!(records[1].record, record_names::GESTURE_RECOGNIZED);
        assert_eq!(records[1].name.as_deref(), Some("circle"));
    }

    #[test]
    fn timestamps_drive_motion_window() {
        let config = RecognizerConfig::default();
        let bus = Arc::new(EventBus::new());
        let mut replayer = Replayer::new(&config, 10, bus);
        let script = "{\"cmd\":\"start_training\"}\n{\"sample\":[1,0,0],\"t\":100}\n{\"sample\":[0,0,0],\"t\":400}\n";
        replayer.run(Cursor::new(script)).unwrap();
        assert_eq!(replayer.unit().motion_status(), Some(false));
        assert_eq!(replayer.unit().buffered_samples().len(), 1);
    }

    #[test]
    fn finish_without_examples_emits_nothing() {
        let bus = Arc::new(EventBus::new());
        let rx = bus.subscribe();
        let summary = replay_script(
            Cursor::new("{\"cmd\":\"finish_training\"}\n"),
            &raw_config(),
            10,
            bus,
        )
        .unwrap();
        assert!(summary.models.is_empty());
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn evaluate_labels_probes() {
        let training = vec![
            TrainingSet {
                name: "circle".to_string(),
                examples: vec![circle(30, 1.0), circle(30, 1.0)],
            },
            TrainingSet {
                name: "line".to_string(),
                examples: vec![line(30, 1.0), line(30, 1.0)],
            },
        ];
        let probes = vec![line(30, 1.0)];
        let eval = evaluate(
            &raw_config(),
            10,
            &training,
            &probes,
            Arc::new(EventBus::new()),
        );
        assert_eq!(eval.models.len(), 2);
        assert_eq!(eval.training_failures, 0);
        assert_eq!(eval.probes[0].matched.as_deref(), Some("line"));
        assert_eq!(eval.probes[0].samples, 30);
    }
}
