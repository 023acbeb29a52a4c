//! Configuration presets for common sensor setups.
//!
//! - Default: the stock chain, for velocity-like input
//! - Raw: no filtering at all
//! - Smoothed: low-pass denoising ahead of the stock gates
//! - Accelerometer: high-pass gravity removal ahead of the stock chain

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::recognizer::{default_filters, FilterSpec, ModelConfig, RecognizerConfig};

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Idle-state, motion-detect and directional-equivalence filters
    Default,
    /// Every sample reaches the gesture buffer
    Raw,
    /// Low-pass smoothing before idle and directional gates
    Smoothed,
    /// High-pass gravity removal before the stock chain
    Accelerometer,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Default,
        PresetName::Raw,
        PresetName::Smoothed,
        PresetName::Accelerometer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Default => "default",
            PresetName::Raw => "raw",
            PresetName::Smoothed => "smoothed",
            PresetName::Accelerometer => "accelerometer",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "default" | "stock" | "auto" => Some(PresetName::Default),
            "raw" | "none" | "unfiltered" => Some(PresetName::Raw),
            "smoothed" | "smooth" | "lowpass" => Some(PresetName::Smoothed),
            "accelerometer" | "accel" | "gravity" => Some(PresetName::Accelerometer),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Default => "Stock chain: drop idle and repeated samples, track motion",
            PresetName::Raw => "No filters; every sample is buffered",
            PresetName::Smoothed => "Low-pass smoothing for noisy sensors, then idle and repeat gates",
            PresetName::Accelerometer => {
                "High-pass gravity removal for raw accelerometers, then the stock chain"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Get the configuration for a preset.
pub fn get_preset(name: PresetName) -> RecognizerConfig {
    let filters = match name {
        PresetName::Default => default_filters(),
        PresetName::Raw => Vec::new(),
        PresetName::Smoothed => vec![
            FilterSpec::low_pass(),
            FilterSpec::idle_state(),
            FilterSpec::directional_equivalence(),
        ],
        PresetName::Accelerometer => {
            let mut chain = vec![FilterSpec::high_pass()];
            chain.extend(default_filters());
            chain
        }
    };

    RecognizerConfig {
        schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
        description: Some(format!("preset:{}", name.as_str())),
        filters,
        model: ModelConfig::default(),
    }
}

/// Information about a preset for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub filters: Vec<String>,
}

impl PresetInfo {
    pub fn from_preset(name: PresetName) -> Self {
        let config = get_preset(name);
        Self {
            name: name.as_str().to_string(),
            description: name.description().to_string(),
            filters: config
                .filter_kinds()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// List all available presets with summary information.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| PresetInfo::from_preset(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_config;

    #[test]
    fn test_preset_name_parsing() {
        assert_eq!(PresetName::parse("default"), Some(PresetName::Default));
        assert_eq!(PresetName::parse("RAW"), Some(PresetName::Raw));
        assert_eq!(PresetName::parse("smooth"), Some(PresetName::Smoothed));
        assert_eq!(PresetName::parse("accel"), Some(PresetName::Accelerometer));
        assert_eq!(PresetName::parse("kalman"), None);
    }

    #[test]
    fn test_from_str_error_lists_presets() {
        let err = "kalman".parse::<PresetName>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("kalman"));
        assert!(msg.contains("default, raw, smoothed, accelerometer"));
    }

    #[test]
    fn every_preset_validates() {
        for &p in PresetName::ALL {
            validate_config(&get_preset(p)).unwrap();
        }
    }

    #[test]
    fn default_preset_is_stock_chain() {
        assert_eq!(get_preset(PresetName::Default).filters, default_filters());
        assert!(get_preset(PresetName::Raw).filters.is_empty());
    }

    #[test]
    fn accelerometer_starts_with_high_pass() {
        let info = PresetInfo::from_preset(PresetName::Accelerometer);
        assert_eq!(info.filters.first().map(String::as_str), Some("high_pass"));
        assert_eq!(info.filters.len(), 4);
    }

    #[test]
    fn list_presets_covers_all_names() {
        let list = list_presets();
        let names: Vec<&str> = list.iter().map(|p| p.name.as_str()).collect();
        for &p in PresetName::ALL {
            assert!(names.contains(&p.as_str()));
        }
    }
}
