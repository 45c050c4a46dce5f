//! Common types for the PII sanitizer.
//!
//! This crate provides the vocabulary shared by the config and engine crates:
//! - PII categories and detector provenance
//! - Validated byte-offset spans
//! - The unified error type with stable codes

pub mod category;
pub mod error;
pub mod span;

pub use category::{Category, Source};
pub use error::{Error, ErrorCategory, Result};
pub use span::{Span, SpanKey};

/// Schema version for serialized reports and detection output.
pub const SCHEMA_VERSION: &str = "1.0.0";
