//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::recognizer::{FilterSpec, ModelConfig, RecognizerConfig, CODEBOOK_SIZE};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

impl From<ValidationError> for mg_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::IoError(msg) | ValidationError::ParseError(msg) => {
                mg_common::Error::Config(msg)
            }
            mismatch @ ValidationError::VersionMismatch { .. } => {
                mg_common::Error::SchemaValidation(mismatch.to_string())
            }
            other => mg_common::Error::InvalidConfig(other.to_string()),
        }
    }
}

/// Validate a recognizer configuration semantically.
pub fn validate_config(config: &RecognizerConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    for (idx, filter) in config.filters.iter().enumerate() {
        validate_filter(&format!("filters[{}]", idx), filter)?;
    }

    validate_model(&config.model)
}

fn validate_filter(field: &str, filter: &FilterSpec) -> ValidationResult<()> {
    match filter {
        FilterSpec::IdleState { sensitivity }
        | FilterSpec::DirectionalEquivalence { sensitivity } => {
            if !sensitivity.is_finite() || *sensitivity < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("{}.sensitivity", field),
                    message: format!("Must be finite and >= 0, got {}", sensitivity),
                });
            }
        }
        FilterSpec::HighPass { factor } | FilterSpec::LowPass { factor } => {
            if !factor.is_finite() || *factor <= 0.0 || *factor > 1.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("{}.factor", field),
                    message: format!("Must be in (0, 1], got {}", factor),
                });
            }
        }
        FilterSpec::MotionDetect { .. } => {}
    }
    Ok(())
}

fn validate_model(model: &ModelConfig) -> ValidationResult<()> {
    if model.states < 2 {
        return Err(ValidationError::InvalidValue {
            field: "model.states".to_string(),
            message: format!("Must be at least 2, got {}", model.states),
        });
    }

    if model.observations < CODEBOOK_SIZE {
        return Err(ValidationError::SemanticError(format!(
            "model.observations ({}) must cover the {}-symbol quantizer codebook",
            model.observations, CODEBOOK_SIZE
        )));
    }

    if model.jump_limit < 1 || model.jump_limit > model.states - 1 {
        return Err(ValidationError::InvalidValue {
            field: "model.jump_limit".to_string(),
            message: format!(
                "Must be between 1 and {} (states - 1), got {}",
                model.states - 1,
                model.jump_limit
            ),
        });
    }

    if model.kmeans_max_iterations < 1 {
        return Err(ValidationError::InvalidValue {
            field: "model.kmeans_max_iterations".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    Ok(())
}
