//! Recognizer configuration types.
//!
//! A configuration file describes the filter chain applied to every incoming
//! sample and the constants each new gesture model is built with. Files are
//! JSON or TOML, chosen by extension:
//!
//! ```toml
//! schema_version = "1.0.0"
//!
//! [[filters]]
//! kind = "idle_state"
//! sensitivity = 0.1
//!
//! [[filters]]
//! kind = "motion_detect"
//! motion_change_time = 190
//!
//! [model]
//! states = 15
//! observations = 20
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::ValidationError;

/// Number of centroids in every quantizer codebook.
pub const CODEBOOK_SIZE: usize = 14;

pub const DEFAULT_IDLE_SENSITIVITY: f64 = 0.1;
/// Milliseconds without motion before the motion flag clears.
pub const DEFAULT_MOTION_CHANGE_TIME: u64 = 190;
pub const DEFAULT_DIRECTIONAL_SENSITIVITY: f64 = 0.2;
pub const DEFAULT_HIGH_PASS_FACTOR: f64 = 0.1;
pub const DEFAULT_LOW_PASS_FACTOR: f64 = 0.01;

pub const DEFAULT_STATES: usize = 15;
pub const DEFAULT_OBSERVATIONS: usize = 20;
pub const DEFAULT_JUMP_LIMIT: usize = 2;
pub const DEFAULT_KMEANS_MAX_ITERATIONS: usize = 1000;

/// Complete recognizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecognizerConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Filters applied in order to each incoming sample.
    #[serde(default = "default_filters")]
    pub filters: Vec<FilterSpec>,

    #[serde(default)]
    pub model: ModelConfig,
}

/// One stage of the filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Drop samples whose magnitude is at or below `sensitivity`.
    IdleState {
        #[serde(default = "default_idle_sensitivity")]
        sensitivity: f64,
    },
    /// Track whether the device is moving. Never drops.
    MotionDetect {
        #[serde(default = "default_motion_change_time")]
        motion_change_time: u64,
    },
    /// Drop samples within `sensitivity` of the last passed sample on every axis.
    DirectionalEquivalence {
        #[serde(default = "default_directional_sensitivity")]
        sensitivity: f64,
    },
    /// Subtract the running average. Removes gravity from raw accelerometer data.
    HighPass {
        #[serde(default = "default_high_pass_factor")]
        factor: f64,
    },
    /// Emit the running average.
    LowPass {
        #[serde(default = "default_low_pass_factor")]
        factor: f64,
    },
}

impl FilterSpec {
    /// Short name used in logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            FilterSpec::IdleState { .. } => "idle_state",
            FilterSpec::MotionDetect { .. } => "motion_detect",
            FilterSpec::DirectionalEquivalence { .. } => "directional_equivalence",
            FilterSpec::HighPass { .. } => "high_pass",
            FilterSpec::LowPass { .. } => "low_pass",
        }
    }

    pub fn idle_state() -> Self {
        FilterSpec::IdleState {
            sensitivity: DEFAULT_IDLE_SENSITIVITY,
        }
    }

    pub fn motion_detect() -> Self {
        FilterSpec::MotionDetect {
            motion_change_time: DEFAULT_MOTION_CHANGE_TIME,
        }
    }

    pub fn directional_equivalence() -> Self {
        FilterSpec::DirectionalEquivalence {
            sensitivity: DEFAULT_DIRECTIONAL_SENSITIVITY,
        }
    }

    pub fn high_pass() -> Self {
        FilterSpec::HighPass {
            factor: DEFAULT_HIGH_PASS_FACTOR,
        }
    }

    pub fn low_pass() -> Self {
        FilterSpec::LowPass {
            factor: DEFAULT_LOW_PASS_FACTOR,
        }
    }
}

/// Constants every new gesture model is built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelConfig {
    /// Hidden states in each HMM.
    #[serde(default = "default_states")]
    pub states: usize,

    /// Emission alphabet size of each HMM. The quantizer only ever emits
    /// symbols below [`CODEBOOK_SIZE`].
    #[serde(default = "default_observations")]
    pub observations: usize,

    /// How many states forward a transition may skip.
    #[serde(default = "default_jump_limit")]
    pub jump_limit: usize,

    /// Upper bound on k-means passes per codebook training.
    #[serde(default = "default_kmeans_max_iterations")]
    pub kmeans_max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            states: DEFAULT_STATES,
            observations: DEFAULT_OBSERVATIONS,
            jump_limit: DEFAULT_JUMP_LIMIT,
            kmeans_max_iterations: DEFAULT_KMEANS_MAX_ITERATIONS,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            filters: default_filters(),
            model: ModelConfig::default(),
        }
    }
}

impl RecognizerConfig {
    /// Load a configuration file. `.toml` files are parsed as TOML, anything
    /// else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if is_toml(path) {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ValidationError> {
        toml::from_str(text).map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Canonical pretty JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Filter kinds in chain order.
    pub fn filter_kinds(&self) -> Vec<&'static str> {
        self.filters.iter().map(FilterSpec::kind).collect()
    }
}

pub(crate) fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

/// The stock chain: idle-state, motion-detect, directional-equivalence.
pub fn default_filters() -> Vec<FilterSpec> {
    vec![
        FilterSpec::idle_state(),
        FilterSpec::motion_detect(),
        FilterSpec::directional_equivalence(),
    ]
}

fn default_idle_sensitivity() -> f64 {
    DEFAULT_IDLE_SENSITIVITY
}

fn default_motion_change_time() -> u64 {
    DEFAULT_MOTION_CHANGE_TIME
}

fn default_directional_sensitivity() -> f64 {
    DEFAULT_DIRECTIONAL_SENSITIVITY
}

fn default_high_pass_factor() -> f64 {
    DEFAULT_HIGH_PASS_FACTOR
}

fn default_low_pass_factor() -> f64 {
    DEFAULT_LOW_PASS_FACTOR
}

fn default_states() -> usize {
    DEFAULT_STATES
}

fn default_observations() -> usize {
    DEFAULT_OBSERVATIONS
}

fn default_jump_limit() -> usize {
    DEFAULT_JUMP_LIMIT
}

fn default_kmeans_max_iterations() -> usize {
    DEFAULT_KMEANS_MAX_ITERATIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_recognizer() {
        let config = RecognizerConfig::default();
        assert_eq!(
            config.filter_kinds(),
            vec!["idle_state", "motion_detect", "directional_equivalence"]
        );
        assert_eq!(config.model.states, 15);
        assert_eq!(config.model.observations, 20);
        assert_eq!(config.model.jump_limit, 2);
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let config = RecognizerConfig::from_json_str(r#"{"schema_version":"1.0.0"}"#).unwrap();
        assert_eq!(config, RecognizerConfig::default());
    }

    #[test]
    fn filter_fields_default_individually() {
        let json = r#"{
            "schema_version": "1.0.0",
            "filters": [{"kind": "high_pass"}, {"kind": "idle_state", "sensitivity": 0.5}]
        }"#;
        let config = RecognizerConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.filters,
            vec![
                FilterSpec::HighPass { factor: 0.1 },
                FilterSpec::IdleState { sensitivity: 0.5 }
            ]
        );
    }

    #[test]
    fn toml_form_parses() {
        let text = r#"
schema_version = "1.0.0"

[[filters]]
kind = "low_pass"
factor = 0.05

[model]
states = 8
"#;
        let config = RecognizerConfig::from_toml_str(text).unwrap();
        assert_eq!(config.filters, vec![FilterSpec::LowPass { factor: 0.05 }]);
        assert_eq!(config.model.states, 8);
        assert_eq!(config.model.observations, DEFAULT_OBSERVATIONS);
    }

    #[test]
    fn unknown_filter_kind_is_parse_error() {
        let json = r#"{"schema_version":"1.0.0","filters":[{"kind":"kalman"}]}"#;
        let err = RecognizerConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn empty_filter_list_is_kept() {
        let json = r#"{"schema_version":"1.0.0","filters":[]}"#;
        let config = RecognizerConfig::from_json_str(json).unwrap();
        assert!(config.filters.is_empty());
    }
}
