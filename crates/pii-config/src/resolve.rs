//! Configuration resolution and path discovery.
//!
//! Resolution order: explicit path → environment variables → XDG paths →
//! system config → defaults.

use std::path::{Path, PathBuf};

use crate::config::SanitizerConfig;
use crate::validate::{validate_config, ValidationResult};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to sanitizer.json (or None if not found).
    pub config: Option<PathBuf>,

    /// Where the config came from (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided by the caller.
    Explicit,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/pii-sanitizer/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit => write!(f, "explicit path"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "PII_SANITIZER_CONFIG";
pub const ENV_CONFIG_DIR: &str = "PII_SANITIZER_CONFIG_DIR";

/// Standard config file name.
const CONFIG_FILENAME: &str = "sanitizer.json";

/// Application name for XDG directories.
const APP_NAME: &str = "pii-sanitizer";

/// Resolve the configuration path using the standard resolution order.
///
/// 1. Explicit path (if provided and present)
/// 2. `PII_SANITIZER_CONFIG` (direct path)
/// 3. `PII_SANITIZER_CONFIG_DIR` + `sanitizer.json`
/// 4. XDG config directory (~/.config/pii-sanitizer/)
/// 5. System config (/etc/pii-sanitizer/)
/// 6. Built-in defaults (None)
pub fn resolve_config(explicit: Option<&Path>) -> ConfigPaths {
    if let Some(path) = explicit {
        if path.exists() {
            return found(path.to_path_buf(), ConfigSource::Explicit);
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    let system_path = system_config_dir().join(CONFIG_FILENAME);
    if system_path.exists() {
        return found(system_path, ConfigSource::SystemConfig);
    }

    ConfigPaths::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPaths {
    ConfigPaths {
        config: Some(path),
        source,
    }
}

/// Resolve, load, and validate. Falls back to defaults when nothing is found.
pub fn load_resolved(explicit: Option<&Path>) -> ValidationResult<(SanitizerConfig, ConfigPaths)> {
    let paths = resolve_config(explicit);
    let config = match &paths.config {
        Some(path) => SanitizerConfig::from_file(path)?,
        None => SanitizerConfig::default(),
    };
    validate_config(&config)?;
    Ok((config, paths))
}

/// Get the XDG config directory for the sanitizer.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
