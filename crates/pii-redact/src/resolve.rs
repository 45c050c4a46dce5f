//! Span resolution: one authoritative, non-overlapping span set.
//!
//! Candidates are ranked by `(confidence desc, source priority, length desc,
//! start asc)` and accepted greedily when they do not overlap an already
//! accepted span. The ranking is a total order, so identical input always
//! yields the identical set.

use pii_common::{Category, Error, Result, Source, Span};
use pii_config::SanitizerConfig;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Non-overlapping spans ordered by `start`.
///
/// Invariant: for `i < j`, `spans[i].end <= spans[j].start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedSpanSet(Vec<Span>);

impl ResolvedSpanSet {
    /// Wrap spans that are already sorted and disjoint.
    ///
    /// Fails with `InternalInconsistency` if they are not.
    pub fn from_sorted(spans: Vec<Span>) -> Result<Self> {
        for pair in spans.windows(2) {
            if pair[0].end > pair[1].start {
                return Err(Error::InternalInconsistency(format!(
                    "spans [{}, {}) and [{}, {}) overlap or are out of order",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                )));
            }
        }
        Ok(Self(spans))
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Span> {
        self.0.get(index)
    }

    pub fn into_vec(self) -> Vec<Span> {
        self.0
    }
}

impl<'a> IntoIterator for &'a ResolvedSpanSet {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Drop candidates below their category's configured threshold.
pub fn apply_thresholds(candidates: Vec<Span>, config: &SanitizerConfig) -> Vec<Span> {
    let before = candidates.len();
    let kept: Vec<Span> = candidates
        .into_iter()
        .filter(|s| s.confidence >= config.threshold_for(s.category))
        .collect();
    if kept.len() != before {
        debug!(dropped = before - kept.len(), "candidates below threshold");
    }
    kept
}

/// Ranking used by [`resolve`]; `Less` wins.
fn rank(a: &Span, b: &Span) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.source.priority().cmp(&b.source.priority()))
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.category.cmp(&b.category))
}

/// Resolve overlapping candidates over `text` into a [`ResolvedSpanSet`].
///
/// Every candidate is validated against `text` first; a zero-length,
/// reversed, out-of-bounds, or misaligned candidate fails the whole call
/// with `InvalidSpan`. Callers drop bad detector output before resolving.
pub fn resolve(text: &str, candidates: Vec<Span>) -> Result<ResolvedSpanSet> {
    for candidate in &candidates {
        candidate.validate_against(text)?;
    }

    let total = candidates.len();
    let mut ranked = candidates;
    ranked.sort_by(rank);

    // start -> accepted span; accepted spans are disjoint, so the entry with
    // the greatest start below `end` is the only one that can overlap.
    let mut accepted: BTreeMap<usize, Span> = BTreeMap::new();
    for candidate in ranked {
        let overlaps = accepted
            .range(..candidate.end)
            .next_back()
            .is_some_and(|(_, prev)| prev.end > candidate.start);
        if !overlaps {
            accepted.insert(candidate.start, candidate);
        }
    }

    let resolved = ResolvedSpanSet(accepted.into_values().collect());
    debug!(
        candidates = total,
        resolved = resolved.len(),
        "spans resolved"
    );
    Ok(resolved)
}

/// Add a span for every other verbatim occurrence of a resolved value.
///
/// Detectors can miss a copy of a value they found elsewhere, such as a
/// phone number glued to an extension. Each uncovered copy gets the
/// category, source and confidence of the value's leftmost span. Longer
/// values claim text first; copies overlapping an existing span are skipped,
/// since redacting that span already breaks them.
pub fn cover_repeats(text: &str, resolved: ResolvedSpanSet) -> ResolvedSpanSet {
    let mut values: Vec<(String, Category, Source, f64)> = Vec::new();
    for span in &resolved {
        if !values.iter().any(|(v, ..)| *v == span.matched_text) {
            values.push((
                span.matched_text.clone(),
                span.category,
                span.source,
                span.confidence,
            ));
        }
    }
    values.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

    let before = resolved.len();
    let mut accepted: BTreeMap<usize, Span> =
        resolved.into_vec().into_iter().map(|s| (s.start, s)).collect();
    for (value, category, source, confidence) in &values {
        for (start, _) in text.match_indices(value.as_str()) {
            let end = start + value.len();
            let overlaps = accepted
                .range(..end)
                .next_back()
                .is_some_and(|(_, prev)| prev.end > start);
            if overlaps {
                continue;
            }
            if let Ok(span) = Span::new(text, start, end, *category, *source, *confidence) {
                accepted.insert(start, span);
            }
        }
    }

    let covered = ResolvedSpanSet(accepted.into_values().collect());
    if covered.len() > before {
        debug!(
            added = covered.len() - before,
            spans = covered.len(),
            "repeated values covered"
        );
    }
    covered
}
