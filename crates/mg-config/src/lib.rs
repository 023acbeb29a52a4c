//! Motion gesture recognizer configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the recognizer configuration (filter chain and
//!   model constants)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Presets for common sensor setups
//! - Config snapshots for run logs

pub mod preset;
pub mod recognizer;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use preset::{get_preset, list_presets, PresetInfo, PresetName};
pub use recognizer::{FilterSpec, ModelConfig, RecognizerConfig};
pub use resolve::{load_config, resolve_config, ConfigPaths, ConfigSource, LoadedConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
