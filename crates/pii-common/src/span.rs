//! Byte-offset spans into the analysed text.

use crate::{Category, Error, Result, Source};
use serde::{Deserialize, Serialize};

/// A contiguous byte range of the original text tagged as PII.
///
/// `start`/`end` are half-open byte offsets. A `Span` can only be built
/// through [`Span::new`], which enforces `start < end <= text.len()` and
/// UTF-8 char boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub category: Category,
    pub source: Source,
    /// Detector confidence in [0, 1].
    pub confidence: f64,
    pub matched_text: String,
}

/// Identity of a span independent of its confidence or provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanKey {
    pub start: usize,
    pub end: usize,
    pub category: Category,
}

impl Span {
    /// Create a span over `text[start..end]`.
    ///
    /// Fails with [`Error::InvalidSpan`] for zero-length, reversed,
    /// out-of-bounds, or non-char-boundary ranges.
    pub fn new(
        text: &str,
        start: usize,
        end: usize,
        category: Category,
        source: Source,
        confidence: f64,
    ) -> Result<Self> {
        validate_range(text, start, end)?;
        Ok(Self {
            start,
            end,
            category,
            source,
            confidence: clamp_confidence(confidence),
            matched_text: text[start..end].to_string(),
        })
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false for a validated span.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether the half-open ranges intersect. Touching spans do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn key(&self) -> SpanKey {
        SpanKey {
            start: self.start,
            end: self.end,
            category: self.category,
        }
    }

    /// Re-check this span against `text` (used on spans from external detectors).
    pub fn validate_against(&self, text: &str) -> Result<()> {
        validate_range(text, self.start, self.end)?;
        if text[self.start..self.end] != self.matched_text {
            return Err(Error::InvalidSpan {
                start: self.start,
                end: self.end,
                len: text.len(),
                reason: "matched text does not match the source range".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_range(text: &str, start: usize, end: usize) -> Result<()> {
    let reason = if start >= end {
        Some("zero-length or reversed range")
    } else if end > text.len() {
        Some("range exceeds text length")
    } else if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
        Some("range splits a UTF-8 character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidSpan {
            start,
            end,
            len: text.len(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Clamp a confidence into [0, 1]; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
