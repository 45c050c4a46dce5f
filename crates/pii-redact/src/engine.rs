//! The sanitizer facade: one call runs the whole pipeline.

use pii_common::{Result, Span};
use pii_config::{load_resolved, validate_config, ConfigSnapshot, SanitizerConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::dedupe::dedupe;
use crate::graph::build_entities;
use crate::logging::event_names;
use crate::ner::{spawn_recognizer, validate_entities, EntityRecognizer, HeuristicRecognizer};
use crate::patterns::detect_patterns;
use crate::policy::{RedactionMode, RedactionPolicy};
use crate::proximity::{annotate, keyword_candidates, ProximityFact};
use crate::redact::redact;
use crate::report::{DegradedDetector, DetectionSummary, SanitizationReport};
use crate::resolve::{apply_thresholds, cover_repeats, resolve, ResolvedSpanSet};

/// Stateless PII sanitizer.
///
/// Holds only immutable configuration and the entity recognizer; every
/// call builds its spans, entities, and report from scratch. Safe to share
/// across threads.
#[derive(Clone)]
pub struct Sanitizer {
    config: SanitizerConfig,
    recognizer: Arc<dyn EntityRecognizer>,
    snapshot: ConfigSnapshot,
}

/// Everything detection produced for one text.
#[derive(Default)]
struct Detection {
    resolved: ResolvedSpanSet,
    facts: Vec<ProximityFact>,
    degraded: Vec<DegradedDetector>,
    dropped_spans: usize,
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer")
            .field("recognizer", &self.recognizer.name())
            .field("config", &self.snapshot.short_id())
            .finish()
    }
}

impl Sanitizer {
    /// Validate `config` and use the built-in heuristic recognizer.
    pub fn new(config: SanitizerConfig) -> Result<Self> {
        Self::with_recognizer(config, Arc::new(HeuristicRecognizer::new()))
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(SanitizerConfig::default())
    }

    /// Validate `config` and use `recognizer` for NAME/ADDRESS/DATE.
    pub fn with_recognizer(
        config: SanitizerConfig,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Result<Self> {
        validate_config(&config)?;
        let snapshot = ConfigSnapshot::in_memory(&config);
        Ok(Self {
            config,
            recognizer,
            snapshot,
        })
    }

    /// Resolve, load, and validate configuration from the standard
    /// locations (see `pii_config::resolve_config`).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, paths) = load_resolved(explicit)?;
        match &paths.config {
            Some(path) => info!(
                event = event_names::CONFIG_LOADED,
                path = %path.display(),
                source = %paths.source,
                "sanitizer configuration loaded"
            ),
            None => info!(
                event = event_names::CONFIG_DEFAULT_USED,
                "no configuration file found, using defaults"
            ),
        }
        let snapshot = ConfigSnapshot::new(&config, &paths);
        Ok(Self {
            config,
            recognizer: Arc::new(HeuristicRecognizer::new()),
            snapshot,
        })
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &ConfigSnapshot {
        &self.snapshot
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Resolved PII spans in `text`, ascending by start. Never mutates text.
    pub fn detect(&self, text: &str) -> Result<Vec<Span>> {
        Ok(self.run_detection(text)?.resolved.into_vec())
    }

    /// Redact `text` under `mode`.
    pub fn sanitize(&self, text: &str, mode: RedactionMode) -> Result<String> {
        let detection = self.run_detection(text)?;
        let policy = RedactionPolicy::from_config(mode, &self.config);
        let out = redact(text, &detection.resolved, &policy)?;
        debug!(
            event = event_names::SANITIZE_FINISHED,
            mode = %mode,
            spans = detection.resolved.len(),
            degraded = detection.degraded.len(),
            output_len = out.len(),
            "sanitize finished"
        );
        Ok(out)
    }

    /// [`Sanitizer::sanitize`] with the mode given by name.
    ///
    /// An unknown name fails with `UnsupportedPolicy` before any detection
    /// runs.
    pub fn sanitize_str(&self, text: &str, mode: &str) -> Result<String> {
        let mode: RedactionMode = mode.parse()?;
        self.sanitize(text, mode)
    }

    /// Redact `text` and explain the result.
    pub fn report(&self, text: &str, mode: RedactionMode) -> Result<SanitizationReport> {
        let detection = self.run_detection(text)?;
        let policy = RedactionPolicy::from_config(mode, &self.config);
        let output_text = redact(text, &detection.resolved, &policy)?;

        let entities = build_entities(text, &detection.resolved, &detection.facts, &self.config);
        let dedup = dedupe(entities, &detection.resolved);
        let summary = DetectionSummary::new(&detection.resolved, &dedup);

        debug!(
            event = event_names::REPORT_BUILT,
            spans = summary.total_detections,
            entities = summary.entity_count,
            clusters = summary.cluster_count,
            "report built"
        );

        Ok(SanitizationReport {
            schema_version: pii_common::SCHEMA_VERSION.to_string(),
            original_length: text.len(),
            spans_found: detection.resolved.into_vec(),
            entities_found: dedup.entities,
            value_links: dedup.links,
            redaction_policy: mode,
            output_text,
            summary,
            degraded: detection.degraded,
            dropped_spans: detection.dropped_spans,
            config: self.snapshot.clone(),
        })
    }

    /// Detectors, proximity, thresholds, resolution.
    ///
    /// The recognizer runs on its own thread while patterns and keyword
    /// rules run here; its result is joined under the configured timeout.
    #[instrument(skip_all, fields(len = text.len()))]
    fn run_detection(&self, text: &str) -> Result<Detection> {
        if text.is_empty() {
            return Ok(Detection::default());
        }
        debug!(event = event_names::SANITIZE_STARTED, "detection started");

        let mut degraded = Vec::new();
        let pending = if self.config.ner.enabled {
            match spawn_recognizer(
                Arc::clone(&self.recognizer),
                Arc::from(text),
                self.config.ner.timeout(),
            ) {
                Ok(pending) => Some(pending),
                Err(e) => {
                    self.record_degraded(&mut degraded, &e);
                    None
                }
            }
        } else {
            None
        };

        let mut candidates = detect_patterns(text);
        debug!(
            event = event_names::DETECT_PATTERNS,
            candidates = candidates.len(),
            "pattern detection finished"
        );

        let keywords = keyword_candidates(text, &self.config.proximity);
        debug!(
            event = event_names::DETECT_KEYWORDS,
            candidates = keywords.len(),
            "keyword detection finished"
        );
        candidates.extend(keywords);

        let mut dropped_spans = 0;
        if let Some(pending) = pending {
            let detector = pending.detector().to_string();
            match pending.wait() {
                Ok(entities) => {
                    let (valid, dropped) = validate_entities(text, entities);
                    if dropped > 0 {
                        warn!(
                            event = event_names::SPAN_DROPPED,
                            detector = %detector,
                            dropped,
                            "recognizer returned invalid spans"
                        );
                    }
                    debug!(
                        event = event_names::DETECT_ENTITIES,
                        candidates = valid.len(),
                        "entity recognition finished"
                    );
                    dropped_spans = dropped;
                    candidates.extend(valid);
                }
                Err(e) => self.record_degraded(&mut degraded, &e),
            }
        }

        let analysis = annotate(candidates, text, &self.config.proximity);
        let candidates = apply_thresholds(analysis.spans, &self.config);
        let resolved = cover_repeats(text, resolve(text, candidates)?);

        debug!(
            event = event_names::RESOLVE_FINISHED,
            spans = resolved.len(),
            facts = analysis.facts.len(),
            degraded = degraded.len(),
            "detection finished"
        );

        Ok(Detection {
            resolved,
            facts: analysis.facts,
            degraded,
            dropped_spans,
        })
    }

    fn record_degraded(&self, degraded: &mut Vec<DegradedDetector>, err: &pii_common::Error) {
        warn!(
            event = event_names::DETECTOR_DEGRADED,
            detector = self.recognizer.name(),
            code = err.code(),
            error = %err,
            "continuing without entity recognition"
        );
        degraded.push(DegradedDetector::from_error(self.recognizer.name(), err));
    }
}
