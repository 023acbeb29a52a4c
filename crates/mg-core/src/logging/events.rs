//! Structured event vocabulary for logging.
//!
//! JSONL lines carry correlation IDs (run_id, session_id) and a stage next
//! to the event name, so these types define the stable parts of that schema.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Samples flowing through the filter chain into a buffer.
    Capture,
    /// Codebook and HMM training.
    Train,
    /// Classification of a buffered gesture.
    Recognize,
    /// Driving a processing unit from a recorded script.
    Replay,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Capture => "capture",
            Stage::Train => "train",
            Stage::Recognize => "recognize",
            Stage::Replay => "replay",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging. Each is also the tracing target.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Capture
    pub const CAPTURE_STARTED: &str = "capture.started";
    pub const CAPTURE_STOPPED: &str = "capture.stopped";
    pub const CAPTURE_DISCARDED: &str = "capture.discarded";

    // Training
    pub const TRAIN_STARTED: &str = "train.started";
    pub const TRAIN_FINISHED: &str = "train.finished";
    pub const TRAIN_FAILED: &str = "train.failed";

    // Recognition
    pub const RECOGNIZE_STARTED: &str = "recognize.started";
    pub const RECOGNIZE_FINISHED: &str = "recognize.finished";

    // Numerical guards
    pub const KMEANS_ITERATION_CAP: &str = "kmeans.iteration_cap";
    pub const HMM_SEQUENCE_SKIPPED: &str = "hmm.sequence_skipped";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
}

/// Context for generating log events with consistent run/session IDs.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub session_id: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
