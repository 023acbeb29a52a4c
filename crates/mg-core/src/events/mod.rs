//! Session records for replay and evaluation output.
//!
//! Records are machine-readable JSONL lines describing what a processing
//! unit did: models trained, gestures recognized, misses. They are separate
//! from diagnostic logs and go to stdout when the output format is `jsonl`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{mpsc, Arc, Mutex};

use crate::classifier::Classification;
use crate::model::ModelSummary;

/// Stable record names.
pub mod record_names {
    pub const SESSION_STARTED: &str = "session_started";
    pub const SESSION_ENDED: &str = "session_ended";

    pub const MODEL_TRAINED: &str = "model_trained";
    pub const TRAINING_FAILED: &str = "training_failed";

    pub const GESTURE_RECOGNIZED: &str = "gesture_recognized";
    pub const GESTURE_UNRECOGNIZED: &str = "gesture_unrecognized";
    pub const RECOGNITION_FAILED: &str = "recognition_failed";

    pub const MODELS_RESET: &str = "models_reset";
}

/// One line of session output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub record: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Script line or probe index that produced the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl SessionRecord {
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            timestamp: Utc::now(),
            session_id: None,
            step: None,
            model_id: None,
            name: None,
            probability: None,
            details: HashMap::new(),
        }
    }

    /// Record for a newly trained model.
    pub fn trained(summary: &ModelSummary) -> Self {
        let mut rec = Self::new(record_names::MODEL_TRAINED)
            .with_detail("training_examples", summary.training_examples)
            .with_detail("radius", summary.radius);
        rec.model_id = Some(summary.id.to_string());
        rec.name = Some(summary.name.clone());
        rec.probability = Some(summary.default_probability);
        rec
    }

    /// Record for a finished recognition; a miss has probability 0.
    pub fn recognition(classification: Option<&Classification>, samples: usize) -> Self {
        match classification {
            Some(c) => {
                let mut rec = Self::new(record_names::GESTURE_RECOGNIZED)
                    .with_detail("samples", samples)
                    .with_detail("likelihood", c.likelihood)
                    .with_detail("prior", c.prior);
                rec.model_id = Some(c.model_id.to_string());
                rec.name = Some(c.name.clone());
                rec.probability = Some(c.probability);
                rec
            }
            None => {
                let mut rec =
                    Self::new(record_names::GESTURE_UNRECOGNIZED).with_detail("samples", samples);
                rec.probability = Some(0.0);
                rec
            }
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","record":"{}"}}"#,
                self.record
            )
        })
    }
}

/// Sink for session records.
pub trait RecordEmitter: Send + Sync {
    fn emit(&self, record: SessionRecord);
}

/// Broadcasts records to channel subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Mutex<Vec<mpsc::Sender<SessionRecord>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<SessionRecord> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        rx
    }

    pub fn emit(&self, record: SessionRecord) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|sender| sender.send(record.clone()).is_ok());
        }
    }
}

impl RecordEmitter for EventBus {
    fn emit(&self, record: SessionRecord) {
        EventBus::emit(self, record);
    }
}

/// Writes one JSON object per line.
pub struct JsonlWriter<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer, e.g. to inspect a buffer in tests.
    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }
}

impl<W: Write + Send> RecordEmitter for JsonlWriter<W> {
    fn emit(&self, record: SessionRecord) {
        let line = record.to_jsonl();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

/// Stamps a session id onto records that lack one.
pub struct SessionEmitter {
    session_id: String,
    inner: Arc<dyn RecordEmitter>,
}

impl SessionEmitter {
    pub fn new(session_id: impl Into<String>, inner: Arc<dyn RecordEmitter>) -> Self {
        Self {
            session_id: session_id.into(),
            inner,
        }
    }
}

impl RecordEmitter for SessionEmitter {
    fn emit(&self, mut record: SessionRecord) {
        if record.session_id.is_none() {
            record.session_id = Some(self.session_id.clone());
        }
        self.inner.emit(record);
    }
}
