//! PII detection and sanitization engine.
//!
//! Given unstructured text, the engine locates PII spans from several
//! independent detectors, resolves their disagreements into one
//! non-overlapping span set, clusters spans that describe the same subject,
//! and rewrites the text under a redaction policy. Everything outside the
//! detected spans is preserved byte-for-byte.
//!
//! # Pipeline
//!
//! ```text
//! text ─┬─ patterns ──────┐
//!       ├─ recognizer ────┼─ proximity ─ resolve ─ graph ─ dedupe ─ redact
//!       └─ keyword rules ─┘
//! ```
//!
//! - **Pattern detection**: email, phone, SSN, card (Luhn), IPv4/IPv6,
//!   expiration dates, labelled CVVs.
//! - **Entity recognition**: a pluggable [`EntityRecognizer`] run under a
//!   timeout; failure degrades to the other detectors.
//! - **Proximity**: co-located spans of different categories, and spans near
//!   a matching label, gain a capped confidence bonus.
//! - **Resolution**: a deterministic greedy pass picks the winning span for
//!   every contested region.
//! - **Entities**: connected components of a span graph; reporting only,
//!   never a redaction gate.
//!
//! No call keeps state: every span, entity, and report is created per call
//! and dropped with it.
//!
//! # Example
//!
//! ```no_run
//! use pii_redact::{RedactionMode, Sanitizer};
//!
//! let sanitizer = Sanitizer::with_defaults().unwrap();
//! let out = sanitizer
//!     .sanitize("Contact john@example.com or call 555-123-4567", RedactionMode::Generic)
//!     .unwrap();
//! assert_eq!(out, "Contact [REDACTED_EMAIL] or call [REDACTED_PHONE]");
//! ```

pub mod dedupe;
pub mod engine;
pub mod graph;
pub mod logging;
pub mod ner;
pub mod patterns;
pub mod policy;
pub mod proximity;
pub mod redact;
pub mod report;
pub mod resolve;

pub use dedupe::{dedupe, Deduplication, Duplicate, EntityView, ValueLink};
pub use engine::Sanitizer;
pub use graph::{build_entities, Entity};
pub use ner::{EntityRecognizer, HeuristicRecognizer, NoopRecognizer};
pub use patterns::detect_patterns;
pub use policy::{RedactionMode, RedactionPolicy, Replacement};
pub use proximity::{annotate, ProximityAnalysis, ProximityFact};
pub use redact::redact;
pub use report::{DegradedDetector, DetectionSummary, SanitizationReport};
pub use resolve::{cover_repeats, resolve, ResolvedSpanSet};

pub use pii_common::{Category, Error, Result, Source, Span, SpanKey};
pub use pii_config::SanitizerConfig;
