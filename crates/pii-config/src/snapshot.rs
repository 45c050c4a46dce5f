//! Configuration snapshots for reproducible sanitization reports.
//!
//! A snapshot captures the effective configuration at the time of a call so
//! a report can be traced back to the exact thresholds and templates used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::SanitizerConfig;
use crate::resolve::{ConfigPaths, ConfigSource};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 of the canonical JSON form of the effective config.
    pub config_hash: String,

    /// Path the config was loaded from, if any.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Source of the configuration.
    pub config_source: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub proximity_enabled: bool,
    pub proximity_window: String,
    pub ner_enabled: bool,
    pub ner_timeout_ms: u64,
    pub graph_enabled: bool,
    pub default_threshold: f64,
    pub threshold_overrides: usize,
    pub template_overrides: usize,
}

impl ConfigSnapshot {
    /// Create a snapshot of `config` as resolved through `paths`.
    pub fn new(config: &SanitizerConfig, paths: &ConfigPaths) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_hash: hash_config(config),
            config_path: paths.config.as_ref().map(|p| p.display().to_string()),
            config_source: paths.source.to_string(),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Snapshot of an in-memory config that was not loaded from disk.
    pub fn in_memory(config: &SanitizerConfig) -> Self {
        let paths = ConfigPaths {
            config: None,
            source: ConfigSource::BuiltinDefault,
        };
        Self::new(config, &paths)
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check if this snapshot matches another (same effective config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(config: &SanitizerConfig) -> Self {
        ConfigSummary {
            proximity_enabled: config.proximity.enabled,
            proximity_window: config.proximity.window.to_string(),
            ner_enabled: config.ner.enabled,
            ner_timeout_ms: config.ner.timeout_ms,
            graph_enabled: config.graph.enabled,
            default_threshold: config.default_threshold,
            threshold_overrides: config.thresholds.len(),
            template_overrides: config.templates.len(),
        }
    }
}

/// Hash the config's canonical JSON. Maps are ordered, so equal configs hash equally.
fn hash_config(config: &SanitizerConfig) -> String {
    let canonical = serde_json::to_string(config).unwrap_or_default();
    hash_content(&canonical)
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
