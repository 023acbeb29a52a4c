//! Configuration snapshots for run logs and reproducibility.
//!
//! A snapshot captures the configuration in effect when a run starts, so a
//! recognition log can be tied back to the exact filter chain and model
//! constants that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::preset::PresetName;
use crate::recognizer::RecognizerConfig;
use crate::resolve::{ConfigPaths, ConfigSource};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// Path the config was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Source of the configuration.
    pub config_source: String,

    #[serde(default)]
    pub preset: Option<String>,

    /// SHA-256 of the file content, or of the canonical JSON form when no
    /// file was read.
    pub content_hash: String,

    pub summary: ConfigSummary,
}

/// Key configuration values for quick reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub filters: Vec<String>,
    pub states: usize,
    pub observations: usize,
    pub jump_limit: usize,
    pub kmeans_max_iterations: usize,
}

impl ConfigSnapshot {
    /// Snapshot of a configuration read from `paths.config`.
    pub fn from_file(config: &RecognizerConfig, paths: &ConfigPaths, content: &str) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_path: paths.config.as_ref().map(|p| p.display().to_string()),
            config_source: paths.source.to_string(),
            preset: None,
            content_hash: hash_content(content),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Snapshot of a preset configuration.
    pub fn from_preset(config: &RecognizerConfig, name: PresetName) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_path: None,
            config_source: ConfigSource::Preset.to_string(),
            preset: Some(name.as_str().to_string()),
            content_hash: hash_config(config),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Create a snapshot with only defaults (no config file loaded).
    pub fn defaults_only() -> Self {
        let config = RecognizerConfig::default();
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            config_path: None,
            config_source: ConfigSource::BuiltinDefault.to_string(),
            preset: None,
            content_hash: hash_config(&config),
            summary: ConfigSummary::from_config(&config),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.content_hash == other.content_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.content_hash[..12.min(self.content_hash.len())]
    }
}

impl ConfigSummary {
    pub fn from_config(config: &RecognizerConfig) -> Self {
        ConfigSummary {
            filters: config
                .filter_kinds()
                .into_iter()
                .map(str::to_string)
                .collect(),
            states: config.model.states,
            observations: config.model.observations,
            jump_limit: config.model.jump_limit,
            kmeans_max_iterations: config.model.kmeans_max_iterations,
        }
    }
}

fn hash_config(config: &RecognizerConfig) -> String {
    let canonical = serde_json::to_string(config).unwrap_or_default();
    hash_content(&canonical)
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_snapshot() {
        let snapshot = ConfigSnapshot::defaults_only();
        assert_eq!(snapshot.schema_version, crate::CONFIG_SCHEMA_VERSION);
        assert!(snapshot.config_path.is_none());
        assert_eq!(snapshot.config_source, "builtin default");
        assert_eq!(snapshot.summary.states, 15);
    }

    #[test]
    fn test_snapshot_short_id() {
        let snapshot = ConfigSnapshot::defaults_only();
        assert_eq!(snapshot.short_id().len(), 12);
    }

    #[test]
    fn test_snapshot_matches() {
        let s1 = ConfigSnapshot::defaults_only();
        let s2 = ConfigSnapshot::defaults_only();
        assert!(s1.matches(&s2));
    }

    #[test]
    fn test_raw_preset_snapshot() {
        let config = crate::preset::get_preset(PresetName::Raw);
        let raw = ConfigSnapshot::from_preset(&config, PresetName::Raw);
        assert!(!raw.matches(&ConfigSnapshot::defaults_only()));
        assert_eq!(raw.preset.as_deref(), Some("raw"));
        assert!(raw.summary.filters.is_empty());
    }

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("test");
        let hash2 = hash_content("test");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let snapshot = ConfigSnapshot::defaults_only();
        let json = snapshot.to_json().unwrap();
        let restored = ConfigSnapshot::from_json(&json).unwrap();
        assert!(snapshot.matches(&restored));
    }
}
