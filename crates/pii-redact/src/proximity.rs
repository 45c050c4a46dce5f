//! Proximity analysis.
//!
//! Two jobs share the same notion of "near":
//!
//! 1. Keyword-labelled candidates. A bare number is only PII because of the
//!    label next to it ("SSN 123456789", "cvv 123"); those values are
//!    emitted as `PROXIMITY` candidates.
//! 2. Annotation. Candidates of different categories that sit near each
//!    other, or near a label for their own category, gain a capped
//!    confidence bonus. Every linked pair is recorded as a
//!    [`ProximityFact`] for the entity graph.

use once_cell::sync::Lazy;
use pii_common::{Category, Source, Span, SpanKey};
use pii_config::{ProximityConfig, ProximityWindow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::patterns::is_isolated;

/// Confidence of a value that is only PII because of a nearby label.
pub const KEYWORD_CANDIDATE_CONFIDENCE: f64 = 0.75;

/// Two spans judged to sit in the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProximityFact {
    pub a: SpanKey,
    pub b: SpanKey,
}

/// Output of [`annotate`].
#[derive(Debug, Clone, Default)]
pub struct ProximityAnalysis {
    /// Input spans with adjusted confidence, in input order.
    pub spans: Vec<Span>,
    pub facts: Vec<ProximityFact>,
}

static KEYWORDS: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    [
        (
            Category::Ssn,
            r"(?i)\b(?:(?:ssn|social[ \t]+security|social)\b|ss[ \t]?#)",
        ),
        (Category::Email, r"(?i)\b(?:e-?mail|mail|contact)\b"),
        (Category::Phone, r"(?i)\b(?:phone|telephone|tel|call|contact|mobile|cell)\b"),
        (
            Category::CreditCard,
            r"(?i)\b(?:credit[ \t]+card|card[ \t]+number|card|cc|visa|mastercard|amex)\b",
        ),
        (
            Category::Cvv,
            r"(?i)\b(?:cvv2?|cvc2?|cid|security[ \t]+code|verification[ \t]+code)\b",
        ),
        (
            Category::ExpirationDate,
            r"(?i)\b(?:exp|expires?|expiry|expiration|valid[ \t]+thru)\b",
        ),
        (Category::Ip, r"(?i)\b(?:ip|ipv4|ipv6|host|server)\b"),
        (
            Category::Address,
            r"(?i)\b(?:address|street|avenue|road|city|state|zip)\b",
        ),
        (Category::Name, r"(?i)\b(?:name|person|individual|customer|user)\b"),
        (
            Category::Date,
            r"(?i)\b(?:date|birth|dob|born|created|modified)\b",
        ),
        (
            Category::DriversLicense,
            r"(?i)\b(?:driver'?s?|driving|licen[cs]e|dl)\b",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| (category, Regex::new(pattern).unwrap()))
    .collect()
});

/// Values that need a label to count as PII.
static BARE_SSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}[- ]?\d{2}[- ]?\d{4}\b").unwrap());
static BARE_CVV: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3,4}\b").unwrap());
static BARE_CARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}(?:[ -]?\d{4}){2}(?:[ -]?\d{1,4}){1,2}\b").unwrap());

/// State license formats: letter prefix plus digits, or `123AB4567`.
/// Letters are upper-case only; the grammar is too loose to run unlabelled.
static BARE_LICENSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[A-Z]{1,3}\d{4,8}|[A-Z]\d{6,12}|\d{3}[A-Z]{2}\d{4})\b").unwrap()
});

static KEYWORD_RULES: [(Category, &Lazy<Regex>); 4] = [
    (Category::Ssn, &BARE_SSN),
    (Category::Cvv, &BARE_CVV),
    (Category::CreditCard, &BARE_CARD),
    (Category::DriversLicense, &BARE_LICENSE),
];

/// A keyword occurrence in the text.
#[derive(Debug, Clone, Copy)]
struct Label {
    category: Category,
    start: usize,
    end: usize,
}

fn find_labels(text: &str) -> Vec<Label> {
    let mut labels = Vec::new();
    for (category, pattern) in KEYWORDS.iter() {
        for m in pattern.find_iter(text) {
            labels.push(Label {
                category: *category,
                start: m.start(),
                end: m.end(),
            });
        }
    }
    labels.sort_by_key(|l| (l.start, l.end));
    labels
}

/// Whether `[a_start, a_end)` and `[b_start, b_end)` are close enough under
/// `window`. Overlapping ranges are always near.
pub fn ranges_within_window(
    text: &str,
    (a_start, a_end): (usize, usize),
    (b_start, b_end): (usize, usize),
    window: ProximityWindow,
) -> bool {
    let (gap_start, gap_end) = if a_end <= b_start {
        (a_end, b_start)
    } else if b_end <= a_start {
        (b_end, a_start)
    } else {
        return true;
    };

    match window {
        ProximityWindow::SameLine => !text[gap_start..gap_end].contains('\n'),
        ProximityWindow::Chars(limit) => gap_end - gap_start <= limit,
    }
}

/// Whether two spans are close enough under `window`.
pub fn within_window(text: &str, a: &Span, b: &Span, window: ProximityWindow) -> bool {
    ranges_within_window(text, (a.start, a.end), (b.start, b.end), window)
}

fn has_label_near(
    text: &str,
    labels: &[Label],
    category: Category,
    start: usize,
    end: usize,
    window: ProximityWindow,
) -> bool {
    labels.iter().any(|l| {
        l.category == category
            && (l.end <= start || l.start >= end)
            && ranges_within_window(text, (l.start, l.end), (start, end), window)
    })
}

/// Emit `PROXIMITY` candidates for bare values sitting near their label.
pub fn keyword_candidates(text: &str, config: &ProximityConfig) -> Vec<Span> {
    if text.is_empty() || !config.enabled {
        return Vec::new();
    }

    let labels = find_labels(text);
    if labels.is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    for (category, pattern) in &KEYWORD_RULES {
        for m in pattern.find_iter(text) {
            if !is_isolated(text, m.start(), m.end()) {
                continue;
            }
            if !has_label_near(text, &labels, *category, m.start(), m.end(), config.window) {
                continue;
            }
            if let Ok(span) = Span::new(
                text,
                m.start(),
                m.end(),
                *category,
                Source::Proximity,
                KEYWORD_CANDIDATE_CONFIDENCE,
            ) {
                spans.push(span);
            }
        }
    }

    spans.sort_by(|a, b| (a.start, a.end, a.category).cmp(&(b.start, b.end, b.category)));
    debug!(candidates = spans.len(), "keyword candidates");
    spans
}

/// Apply proximity bonuses to `spans` and record the linked pairs.
///
/// A span earns `config.bonus` for each distinct other category found
/// within the window and once more for a nearby label of its own category.
/// The total is capped at `config.max_bonus` and the result never exceeds
/// 1.0. Overlapping spans are competing readings of the same text, not
/// neighbours, so they never link.
pub fn annotate(spans: Vec<Span>, text: &str, config: &ProximityConfig) -> ProximityAnalysis {
    if !config.enabled || spans.is_empty() {
        return ProximityAnalysis {
            spans,
            facts: Vec::new(),
        };
    }

    let window = config.window;
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&i| (spans[i].start, spans[i].end, spans[i].category));

    let mut neighbour_categories: Vec<BTreeSet<Category>> = vec![BTreeSet::new(); spans.len()];
    let mut facts = BTreeSet::new();

    for (pos, &i) in order.iter().enumerate() {
        let a = &spans[i];
        for &j in &order[pos + 1..] {
            let b = &spans[j];
            if b.start < a.end {
                // Overlapping candidate
                continue;
            }
            if !within_window(text, a, b, window) {
                // Later spans start even further away.
                break;
            }
            if a.category == b.category {
                continue;
            }
            neighbour_categories[i].insert(b.category);
            neighbour_categories[j].insert(a.category);
            let (x, y) = if a.key() <= b.key() {
                (a.key(), b.key())
            } else {
                (b.key(), a.key())
            };
            facts.insert(ProximityFact { a: x, b: y });
        }
    }

    let labels = find_labels(text);
    let mut boosted = 0usize;
    let spans: Vec<Span> = spans
        .into_iter()
        .enumerate()
        .map(|(i, mut span)| {
            let mut hits = neighbour_categories[i].len();
            if has_label_near(text, &labels, span.category, span.start, span.end, window) {
                hits += 1;
            }
            if hits > 0 {
                let bonus = (config.bonus * hits as f64).min(config.max_bonus);
                span.confidence = (span.confidence + bonus).min(1.0);
                boosted += 1;
            }
            span
        })
        .collect();

    let facts: Vec<ProximityFact> = facts.into_iter().collect();
    debug!(
        spans = spans.len(),
        boosted,
        facts = facts.len(),
        window = %window,
        "proximity annotated"
    );

    ProximityAnalysis { spans, facts }
}
