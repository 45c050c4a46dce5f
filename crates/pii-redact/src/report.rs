//! Structured sanitization results.

use pii_common::{Category, Error, Result, Span};
use pii_config::ConfigSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dedupe::{Deduplication, EntityView, ValueLink};
use crate::policy::RedactionMode;
use crate::resolve::ResolvedSpanSet;

/// A detector that contributed nothing because it failed or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedDetector {
    pub detector: String,
    pub error_code: u32,
    pub reason: String,
}

impl DegradedDetector {
    /// Record `err` against `detector`.
    pub fn from_error(detector: &str, err: &Error) -> Self {
        match err {
            Error::DetectorUnavailable { detector, reason } => Self {
                detector: detector.clone(),
                error_code: err.code(),
                reason: reason.clone(),
            },
            other => Self {
                detector: detector.to_string(),
                error_code: other.code(),
                reason: other.to_string(),
            },
        }
    }
}

/// Counts over one call's detections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total_detections: usize,
    /// Resolved spans per category; absent categories are omitted.
    pub categories: BTreeMap<Category, usize>,
    /// Distinct `(category, value)` pairs.
    pub unique_values: usize,
    pub entity_count: usize,
    pub cluster_count: usize,
    pub duplicate_mentions: usize,
    pub linked_values: usize,
}

impl DetectionSummary {
    pub fn new(resolved: &ResolvedSpanSet, dedup: &Deduplication) -> Self {
        let mut categories = BTreeMap::new();
        for span in resolved {
            *categories.entry(span.category).or_insert(0) += 1;
        }
        Self {
            total_detections: resolved.len(),
            categories,
            unique_values: dedup.unique_values(),
            entity_count: dedup.entities.len(),
            cluster_count: dedup
                .entities
                .iter()
                .filter(|v| v.entity.is_cluster())
                .count(),
            duplicate_mentions: dedup.entities.iter().map(|v| v.duplicates.len()).sum(),
            linked_values: dedup.links.len(),
        }
    }
}

/// Full result of one `report` call. Built once; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationReport {
    pub schema_version: String,
    /// Input length in bytes.
    pub original_length: usize,
    /// Resolved spans, ascending by start. Entity members index into this.
    pub spans_found: Vec<Span>,
    pub entities_found: Vec<EntityView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_links: Vec<ValueLink>,
    pub redaction_policy: RedactionMode,
    pub output_text: String,
    pub summary: DetectionSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedDetector>,
    /// Detector spans rejected as invalid before resolution.
    #[serde(default)]
    pub dropped_spans: usize,
    pub config: ConfigSnapshot,
}

impl SanitizationReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether any detector was skipped for this call.
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// The entity view containing span `index`.
    pub fn entity_of(&self, index: usize) -> Option<&EntityView> {
        self.entities_found
            .iter()
            .find(|v| v.entity.members().contains(&index))
    }
}
