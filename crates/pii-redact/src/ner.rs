//! Named-entity recognition capability.
//!
//! The engine consumes entity recognition through [`EntityRecognizer`] and
//! never depends on a concrete model. Recognizers run on their own thread
//! under a deadline; if the deadline passes, or the recognizer fails or
//! panics, the call continues without entity spans.

use once_cell::sync::Lazy;
use pii_common::{Category, Error, Result, Source, Span};
use regex::Regex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Entity recognition capability.
///
/// Implementations return NAME/ADDRESS/DATE spans over `text` with a
/// confidence in [0, 1]. Returned spans are re-validated by the engine;
/// invalid ones are dropped.
pub trait EntityRecognizer: Send + Sync {
    /// Identifier used in logs and in the report's degraded list.
    fn name(&self) -> &str;

    /// Extract entity spans from `text`.
    fn detect_entities(&self, text: &str) -> Result<Vec<Span>>;
}

/// Recognizer that finds nothing. Used when no model is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecognizer;

impl EntityRecognizer for NoopRecognizer {
    fn name(&self) -> &str {
        "noop"
    }

    fn detect_entities(&self, _text: &str) -> Result<Vec<Span>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// HeuristicRecognizer
// ============================================================================

/// Regex heuristics for titled or labelled names, street addresses,
/// P.O. boxes, and written dates.
///
/// Name rules only accept `Titlecase` words, so bracketed redaction tags are
/// never re-detected.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicRecognizer;

impl HeuristicRecognizer {
    pub fn new() -> Self {
        Self
    }
}

struct EntityRule {
    category: Category,
    pattern: &'static Lazy<Regex>,
    group: usize,
    confidence: f64,
}

static TITLED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:Mr|Mrs|Ms|Miss|Mx|Dr|Prof)\.?[ \t]+([A-Z][a-z]+(?:[ \t]+[A-Z]\.)?(?:[ \t]+[A-Z][a-z]+(?:-[A-Z][a-z]+)?)?)",
    )
    .unwrap()
});

static LABELLED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i:\b(?:full[ \t]+)?name)[ \t]*[:=][ \t]*([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){0,2})",
    )
    .unwrap()
});

static STREET_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b\d{1,5}(?:[ \t]+[A-Z][a-z]+){1,3}[ \t]+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Way|Place|Pl|Terrace)\b",
    )
    .unwrap()
});

static PO_BOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bP\.?[ \t]?O\.?[ \t]+Box[ \t]+\d+\b").unwrap());

static WRITTEN_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)[ \t]+\d{1,2}(?:st|nd|rd|th)?,?[ \t]+\d{4}\b",
    )
    .unwrap()
});

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])\b").unwrap());

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:0?[1-9]|1[0-2])/(?:0?[1-9]|[12]\d|3[01])/\d{4}\b").unwrap());

static ENTITY_RULES: &[EntityRule] = &[
    EntityRule {
        category: Category::Name,
        pattern: &TITLED_NAME,
        group: 1,
        confidence: 0.85,
    },
    EntityRule {
        category: Category::Name,
        pattern: &LABELLED_NAME,
        group: 1,
        confidence: 0.8,
    },
    EntityRule {
        category: Category::Address,
        pattern: &STREET_ADDRESS,
        group: 0,
        confidence: 0.7,
    },
    EntityRule {
        category: Category::Address,
        pattern: &PO_BOX,
        group: 0,
        confidence: 0.7,
    },
    EntityRule {
        category: Category::Date,
        pattern: &WRITTEN_DATE,
        group: 0,
        confidence: 0.8,
    },
    EntityRule {
        category: Category::Date,
        pattern: &ISO_DATE,
        group: 0,
        confidence: 0.7,
    },
    EntityRule {
        category: Category::Date,
        pattern: &NUMERIC_DATE,
        group: 0,
        confidence: 0.7,
    },
];

impl EntityRecognizer for HeuristicRecognizer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn detect_entities(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();
        for rule in ENTITY_RULES {
            for caps in rule.pattern.captures_iter(text) {
                let Some(m) = caps.get(rule.group) else {
                    continue;
                };
                spans.push(Span::new(
                    text,
                    m.start(),
                    m.end(),
                    rule.category,
                    Source::Ner,
                    rule.confidence,
                )?);
            }
        }
        spans.sort_by(|a, b| (a.start, a.end, a.category).cmp(&(b.start, b.end, b.category)));
        spans.dedup_by(|a, b| a.key() == b.key());
        Ok(spans)
    }
}

// ============================================================================
// Bounded-latency execution
// ============================================================================

/// An entity recognition call running on a worker thread.
pub struct PendingEntities {
    detector: String,
    rx: Receiver<Result<Vec<Span>>>,
    deadline: Instant,
    timeout: Duration,
}

/// Start `recognizer` on its own thread over a shared copy of the text.
///
/// The caller keeps working and collects the result with
/// [`PendingEntities::wait`]. A recognizer that overruns its deadline is
/// abandoned: its thread finishes in the background and the result is
/// discarded.
pub fn spawn_recognizer(
    recognizer: Arc<dyn EntityRecognizer>,
    text: Arc<str>,
    timeout: Duration,
) -> Result<PendingEntities> {
    let detector = recognizer.name().to_string();
    let (tx, rx) = mpsc::channel();
    let worker_name = detector.clone();

    std::thread::Builder::new()
        .name(format!("pii-ner-{}", detector))
        .spawn(move || {
            // Requires the unwind panic strategy; under `panic = "abort"` a
            // recognizer panic still takes the process down.
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                recognizer.detect_entities(&text)
            }))
            .unwrap_or_else(|payload| {
                Err(Error::detector_unavailable(
                    &worker_name,
                    format!("recognizer panicked: {}", panic_message(&*payload)),
                ))
            });
            // The receiver is gone after a timeout.
            let _ = tx.send(result);
        })
        .map_err(|e| Error::detector_unavailable(&detector, format!("spawn failed: {}", e)))?;

    Ok(PendingEntities {
        detector,
        rx,
        deadline: Instant::now() + timeout,
        timeout,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string payload"
    }
}

impl PendingEntities {
    pub fn detector(&self) -> &str {
        &self.detector
    }

    /// Block until the recognizer answers or the deadline passes.
    pub fn wait(self) -> Result<Vec<Span>> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(Ok(spans)) => {
                debug!(detector = %self.detector, spans = spans.len(), "recognizer finished");
                Ok(spans)
            }
            Ok(Err(e @ Error::DetectorUnavailable { .. })) => Err(e),
            Ok(Err(e)) => Err(Error::detector_unavailable(
                &self.detector,
                format!("recognizer failed (code {}): {}", e.code(), e),
            )),
            Err(RecvTimeoutError::Timeout) => Err(Error::detector_unavailable(
                &self.detector,
                format!("no answer within {}ms", self.timeout.as_millis()),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(Error::detector_unavailable(
                &self.detector,
                "recognizer thread terminated without a result",
            )),
        }
    }
}

/// Run `recognizer` synchronously under `timeout`.
pub fn detect_with_timeout(
    recognizer: Arc<dyn EntityRecognizer>,
    text: &str,
    timeout: Duration,
) -> Result<Vec<Span>> {
    spawn_recognizer(recognizer, Arc::from(text), timeout)?.wait()
}

/// Keep the spans that are valid for `text`, retagged as NER output.
///
/// Returns the kept spans and the number dropped. Only offsets are logged.
pub fn validate_entities(text: &str, spans: Vec<Span>) -> (Vec<Span>, usize) {
    let mut kept = Vec::with_capacity(spans.len());
    let mut dropped = 0;

    for mut span in spans {
        match span.validate_against(text) {
            Ok(()) => {
                span.source = Source::Ner;
                span.confidence = pii_common::span::clamp_confidence(span.confidence);
                kept.push(span);
            }
            Err(e) => {
                warn!(
                    start = span.start,
                    end = span.end,
                    category = %span.category,
                    code = e.code(),
                    "dropping invalid recognizer span"
                );
                dropped += 1;
            }
        }
    }

    (kept, dropped)
}
