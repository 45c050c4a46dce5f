//! PII sanitizer configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for sanitizer.json
//! - Config resolution (explicit path → env → XDG → defaults)
//! - Semantic validation with stable error codes
//! - Config snapshots attached to sanitization reports

pub mod config;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use config::{
    GraphConfig, MaskStyle, NerConfig, ProximityConfig, ProximityWindow, SanitizerConfig,
    TemplateRule, DEFAULT_TAG_TEMPLATE,
};
pub use resolve::{load_resolved, resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
