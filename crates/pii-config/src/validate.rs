//! Configuration validation errors and semantic validation.

use pii_common::Category;
use thiserror::Error;

use crate::config::{ProximityWindow, SanitizerConfig};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound on the NER budget; anything longer defeats the timeout.
pub const MAX_NER_TIMEOUT_MS: u64 = 60_000;

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

impl From<ValidationError> for pii_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidValue { field, message } => {
                pii_common::Error::InvalidConfig { field, message }
            }
            other => pii_common::Error::Config(other.to_string()),
        }
    }
}

/// Validate a sanitizer configuration semantically.
pub fn validate_config(config: &SanitizerConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_unit_interval("default_threshold", config.default_threshold)?;
    for (category, threshold) in &config.thresholds {
        validate_unit_interval(&format!("thresholds.{}", category), *threshold)?;
    }

    let proximity = &config.proximity;
    validate_unit_interval("proximity.bonus", proximity.bonus)?;
    validate_unit_interval("proximity.max_bonus", proximity.max_bonus)?;
    if proximity.bonus > proximity.max_bonus {
        return Err(ValidationError::SemanticError(format!(
            "proximity.bonus ({}) must not exceed proximity.max_bonus ({})",
            proximity.bonus, proximity.max_bonus
        )));
    }
    if proximity.window == ProximityWindow::Chars(0) {
        return Err(ValidationError::InvalidValue {
            field: "proximity.window.chars".to_string(),
            message: "must be > 0".to_string(),
        });
    }

    if config.ner.timeout_ms == 0 || config.ner.timeout_ms > MAX_NER_TIMEOUT_MS {
        return Err(ValidationError::InvalidValue {
            field: "ner.timeout_ms".to_string(),
            message: format!("must be in 1..={}, got {}", MAX_NER_TIMEOUT_MS, config.ner.timeout_ms),
        });
    }

    for (category, rule) in &config.templates {
        if let Some(tag) = &rule.tag {
            validate_tag(*category, tag)?;
        }
    }

    Ok(())
}

fn validate_unit_interval(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("must be in [0, 1], got {}", value),
        });
    }
    Ok(())
}

fn validate_tag(category: Category, tag: &str) -> ValidationResult<()> {
    let field = format!("templates.{}.tag", category);
    if tag.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field,
            message: "must not be empty".to_string(),
        });
    }
    let stripped = tag.replace("{category}", "");
    if stripped.contains('{') || stripped.contains('}') {
        return Err(ValidationError::InvalidValue {
            field,
            message: "only the {category} placeholder is supported".to_string(),
        });
    }
    Ok(())
}
