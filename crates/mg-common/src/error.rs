//! Error types for the gesture recognizer.
//!
//! Every failure that crosses a crate boundary ends up as [`Error`], which
//! carries:
//! - a stable numeric code for machine parsing
//! - a category for grouping
//! - a recoverability hint
//! - a remediation line for humans
//!
//! ```text
//! ✗ Model Not Trained
//!   Reason: model not trained: quantizer has no codebook
//!   Fix: Record at least one training gesture before recognizing.
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for recognizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file and preset errors.
    Config,
    /// Sample capture and input script errors.
    Capture,
    /// Quantizer, HMM and classifier errors.
    Model,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Capture => write!(f, "capture"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested follow-up for scripted callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation.
    Retry,
    /// Fall back to the default configuration.
    ResetConfig,
    /// Run `config validate`.
    RunCheck,
    /// Capture the gesture again.
    Recapture,
    /// Train the model again with different examples.
    Retrain,
    /// Skip this item and continue.
    Skip,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::Recapture => write!(f, "recapture"),
            SuggestedAction::Retrain => write!(f, "retrain"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    // Capture errors (20-29)
    #[error("gesture has no samples")]
    EmptyGesture,

    #[error("invalid sample at {index}: {reason}")]
    InvalidSample { index: usize, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Model errors (30-39)
    #[error("model not trained: {0}")]
    NotTrained(String),

    #[error("numerical instability detected: {0}")]
    Numerical(String),

    #[error("degenerate training: {0}")]
    DegenerateTraining(String),

    #[error("training failed: {0}")]
    Training(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable error code.
    ///
    /// - 10-19: Configuration errors
    /// - 20-29: Capture errors
    /// - 30-39: Model errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::SchemaValidation(_) => 12,
            Error::EmptyGesture => 20,
            Error::InvalidSample { .. } => 21,
            Error::InvalidInput(_) => 22,
            Error::NotTrained(_) => 30,
            Error::Numerical(_) => 31,
            Error::DegenerateTraining(_) => 32,
            Error::Training(_) => 33,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) | Error::SchemaValidation(_) => {
                ErrorCategory::Config
            }

            Error::EmptyGesture | Error::InvalidSample { .. } | Error::InvalidInput(_) => {
                ErrorCategory::Capture
            }

            Error::NotTrained(_)
            | Error::Numerical(_)
            | Error::DegenerateTraining(_)
            | Error::Training(_) => ErrorCategory::Model,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the caller can reasonably recover and carry on.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidConfig(_) => true,
            Error::SchemaValidation(_) => true,

            Error::EmptyGesture => true,
            Error::InvalidSample { .. } => true,
            Error::InvalidInput(_) => false,

            Error::NotTrained(_) => true,
            Error::Numerical(_) => true,
            Error::DegenerateTraining(_) => true,
            Error::Training(_) => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidConfig(_) => SuggestedAction::ResetConfig,
            Error::SchemaValidation(_) => SuggestedAction::RunCheck,

            Error::EmptyGesture => SuggestedAction::Recapture,
            Error::InvalidSample { .. } => SuggestedAction::Skip,
            Error::InvalidInput(_) => SuggestedAction::ManualIntervention,

            Error::NotTrained(_) => SuggestedAction::Retrain,
            Error::Numerical(_) => SuggestedAction::Retrain,
            Error::DegenerateTraining(_) => SuggestedAction::Retrain,
            Error::Training(_) => SuggestedAction::Retrain,

            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'mg-core config validate' to check the configuration file.",
            Error::InvalidConfig(_) => {
                "Fix the reported field, or drop the file to fall back to the built-in defaults."
            }
            Error::SchemaValidation(_) => {
                "Compare the file against 'mg-core config schema' and update the schema_version."
            }

            Error::EmptyGesture => "Perform the gesture again; no motion was captured.",
            Error::InvalidSample { .. } => {
                "Samples must be three finite numbers. Check the sensor feed for NaN or infinity."
            }
            Error::InvalidInput(_) => {
                "Each script line must be a JSON object with either a 'cmd' or a 'sample' field."
            }

            Error::NotTrained(_) => "Record at least one training gesture before recognizing.",
            Error::Numerical(_) => {
                "Probabilities underflowed. Use shorter gestures or fewer HMM states."
            }
            Error::DegenerateTraining(_) => {
                "No training example could be explained by the model. Record new examples."
            }
            Error::Training(_) => "Record new training examples and train again.",

            Error::Io(_) => "Check that the file exists and is readable, then retry.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Configuration",
            Error::SchemaValidation(_) => "Schema Validation Failed",

            Error::EmptyGesture => "Empty Gesture",
            Error::InvalidSample { .. } => "Invalid Sample",
            Error::InvalidInput(_) => "Invalid Input",

            Error::NotTrained(_) => "Model Not Trained",
            Error::Numerical(_) => "Numerical Instability",
            Error::DegenerateTraining(_) => "Degenerate Training",
            Error::Training(_) => "Training Failed",

            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
    pub suggested_action: SuggestedAction,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();
        if let Error::InvalidSample { index, .. } = err {
            context.insert("index".to_string(), serde_json::json!(index));
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for stderr.
///
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("test".into()).code(), 10);
        assert_eq!(Error::EmptyGesture.code(), 20);
        assert_eq!(Error::DegenerateTraining("x".into()).code(), 32);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::InvalidConfig("x".into()).category(), ErrorCategory::Config);
        assert_eq!(
            Error::InvalidSample {
                index: 3,
                reason: "nan".into()
            }
            .category(),
            ErrorCategory::Capture
        );
        assert_eq!(Error::NotTrained("x".into()).category(), ErrorCategory::Model);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(Error::from(io).category(), ErrorCategory::Io);
    }

    #[test]
    fn test_codes_fall_in_category_ranges() {
        let errors = vec![
            Error::Config("a".into()),
            Error::SchemaValidation("a".into()),
            Error::EmptyGesture,
            Error::InvalidInput("a".into()),
            Error::Numerical("a".into()),
            Error::Training("a".into()),
        ];
        for err in errors {
            let range = match err.category() {
                ErrorCategory::Config => 10..20,
                ErrorCategory::Capture => 20..30,
                ErrorCategory::Model => 30..40,
                ErrorCategory::Io => 60..70,
            };
            assert!(range.contains(&err.code()), "{err}");
        }
    }

    #[test]
    fn test_structured_error_context() {
        let err = Error::InvalidSample {
            index: 7,
            reason: "non-finite".into(),
        };
        let structured = StructuredError::from(&err).with_context("file", "probe.json");
        assert_eq!(structured.code, 21);
        assert_eq!(structured.context["index"], serde_json::json!(7));
        let json = structured.to_json();
        assert!(json.contains("\"category\":\"capture\""));
        assert!(json.contains("\"suggested_action\":\"skip\""));
    }

    #[test]
    fn test_format_error_human_plain() {
        let text = format_error_human(&Error::NotTrained("no codebook".into()), false);
        assert!(text.starts_with("✗ Model Not Trained"));
        assert!(text.contains("Reason: model not trained: no codebook"));
        assert!(text.contains("Fix: Record at least one"));
        assert!(!text.contains("\x1b["));
    }
}
