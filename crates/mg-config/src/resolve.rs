//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → defaults.

use std::path::{Path, PathBuf};

use crate::preset::{get_preset, PresetName};
use crate::recognizer::{is_toml, RecognizerConfig};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_config, ValidationError, ValidationResult};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to the recognizer config (or None if not found).
    pub config: Option<PathBuf>,

    /// Where it was found (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Selected with `--preset`.
    Preset,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::Preset => write!(f, "preset"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
const ENV_CONFIG_PATH: &str = "MG_CONFIG";
const ENV_CONFIG_DIR: &str = "MG_CONFIG_DIR";

/// Standard config file names, in lookup order.
const CONFIG_FILENAMES: &[&str] = &["recognizer.json", "recognizer.toml"];

/// Application name for XDG directories.
const APP_NAME: &str = "motion-gestures";

/// Resolve the configuration path using the standard resolution order.
///
/// 1. Explicit CLI path (if it exists)
/// 2. `MG_CONFIG` environment variable
/// 3. `MG_CONFIG_DIR` + `recognizer.json` / `recognizer.toml`
/// 4. XDG config directory (`~/.config/motion-gestures/`)
/// 5. Built-in defaults (None)
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPaths {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            return found(path.to_path_buf(), ConfigSource::CliArgument);
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = first_config_file(Path::new(&config_dir)) {
            return found(path, ConfigSource::Environment);
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        if let Some(path) = first_config_file(&dir) {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    ConfigPaths::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPaths {
    ConfigPaths {
        config: Some(path),
        source,
    }
}

fn first_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Get the XDG config directory for the recognizer.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// A validated configuration plus the snapshot describing where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RecognizerConfig,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, load and validate the recognizer configuration.
///
/// An explicit `cli_path` must exist. A preset wins over any file found
/// through the environment or XDG lookup, but not over `cli_path`.
pub fn load_config(
    cli_path: Option<&Path>,
    preset: Option<PresetName>,
) -> ValidationResult<LoadedConfig> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    }

    if cli_path.is_none() {
        if let Some(name) = preset {
            let config = get_preset(name);
            validate_config(&config)?;
            let snapshot = ConfigSnapshot::from_preset(&config, name);
            return Ok(LoadedConfig { config, snapshot });
        }
    }

    let paths = resolve_config(cli_path);
    match &paths.config {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let config = if is_toml(path) {
                RecognizerConfig::from_toml_str(&content)?
            } else {
                RecognizerConfig::from_json_str(&content)?
            };
            validate_config(&config)?;
            let snapshot = ConfigSnapshot::from_file(&config, &paths, &content);
            Ok(LoadedConfig { config, snapshot })
        }
        None => {
            let config = RecognizerConfig::default();
            let snapshot = ConfigSnapshot::defaults_only();
            Ok(LoadedConfig { config, snapshot })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", ConfigSource::Preset), "preset");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }

    #[test]
    fn test_missing_cli_path_is_error() {
        let err = load_config(Some(Path::new("/nonexistent/recognizer.json")), None).unwrap_err();
        assert!(matches!(err, ValidationError::IoError(_)));
    }
}
