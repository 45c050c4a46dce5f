//! Error types for the PII sanitizer.
//!
//! Errors carry stable numeric codes and a category so callers (CLI front
//! ends, tool handlers) can map them without string matching. Messages never
//! include matched PII text; spans are described by offsets only.
//!
//! ```text
//! code  category   meaning
//! 10    config     configuration could not be loaded
//! 20    detection  a detector produced an unusable span
//! 30    detection  a detector failed or timed out
//! 40    policy     unknown redaction mode
//! 50    internal   redaction invariant violated
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for sanitizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration loading and validation.
    Config,
    /// Detector output and availability.
    Detection,
    /// Caller-selected redaction policy.
    Policy,
    /// Invariant violations inside the engine.
    Internal,
    /// File I/O and serialization.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Detection => write!(f, "detection"),
            ErrorCategory::Policy => write!(f, "policy"),
            ErrorCategory::Internal => write!(f, "internal"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the sanitizer.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    // Detection errors (20-39)
    #[error("invalid span [{start}, {end}) for text of length {len}: {reason}")]
    InvalidSpan {
        start: usize,
        end: usize,
        len: usize,
        reason: String,
    },

    #[error("detector '{detector}' unavailable: {reason}")]
    DetectorUnavailable { detector: String, reason: String },

    // Policy errors (40-49)
    #[error("unsupported redaction policy '{0}' (expected generic, mask, or remove)")]
    UnsupportedPolicy(String),

    // Internal errors (50-59)
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig { .. } => 11,
            Error::InvalidSpan { .. } => 20,
            Error::DetectorUnavailable { .. } => 30,
            Error::UnsupportedPolicy(_) => 40,
            Error::InternalInconsistency(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } => ErrorCategory::Config,
            Error::InvalidSpan { .. } | Error::DetectorUnavailable { .. } => {
                ErrorCategory::Detection
            }
            Error::UnsupportedPolicy(_) => ErrorCategory::Policy,
            Error::InternalInconsistency(_) => ErrorCategory::Internal,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the pipeline continues after this error.
    ///
    /// Bad spans are dropped and failed detectors contribute an empty set;
    /// everything else fails the call.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidSpan { .. } | Error::DetectorUnavailable { .. }
        )
    }

    /// Convenience constructor for detector failures.
    pub fn detector_unavailable(detector: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::DetectorUnavailable {
            detector: detector.into(),
            reason: reason.into(),
        }
    }
}
