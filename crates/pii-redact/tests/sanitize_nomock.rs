//! No-mock integration tests for the sanitization pipeline.
//!
//! Every test runs the real detectors, resolver, graph, and redactor through
//! the public `Sanitizer` API, covering:
//!
//! - The documented GENERIC / MASK / REMOVE scenarios
//! - Duplicate and cross-entity reporting
//! - Canary values never surviving redaction
//! - Pluggable and misbehaving recognizers
//! - Configuration files and thresholds

use pii_common::{Category, Error, Result, Source, Span};
use pii_redact::dedupe::Duplicate;
use pii_redact::{EntityRecognizer, RedactionMode, Sanitizer, SanitizerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// Default config with a recognizer budget generous enough for loaded CI hosts.
fn patient_config() -> SanitizerConfig {
    let mut config = SanitizerConfig::default();
    config.ner.timeout_ms = 10_000;
    config
}

fn sanitizer() -> Sanitizer {
    Sanitizer::new(patient_config()).unwrap()
}

/// Tags every occurrence of a fixed word list as NAME.
struct WordListRecognizer(Vec<&'static str>);

impl EntityRecognizer for WordListRecognizer {
    fn name(&self) -> &str {
        "word-list"
    }

    fn detect_entities(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();
        for word in &self.0 {
            for (start, _) in text.match_indices(word) {
                spans.push(Span::new(
                    text,
                    start,
                    start + word.len(),
                    Category::Name,
                    Source::Ner,
                    0.9,
                )?);
            }
        }
        Ok(spans)
    }
}

struct HangingRecognizer;

impl EntityRecognizer for HangingRecognizer {
    fn name(&self) -> &str {
        "hanging"
    }

    fn detect_entities(&self, _text: &str) -> Result<Vec<Span>> {
        std::thread::sleep(Duration::from_secs(2));
        Ok(Vec::new())
    }
}

struct PanickingRecognizer;

impl EntityRecognizer for PanickingRecognizer {
    fn name(&self) -> &str {
        "panicking"
    }

    fn detect_entities(&self, _text: &str) -> Result<Vec<Span>> {
        panic!("model crashed");
    }
}

const CANARY_DOCUMENT: &str = "Customer record:\n\
name: Jane Roe\n\
email jane.roe@example.com, phone 555-123-4567\n\
ssn 123-45-6789 card 4111 1111 1111 1111 from 10.20.30.40\n";

const CANARIES: &[&str] = &[
    "Jane Roe",
    "jane.roe@example.com",
    "555-123-4567",
    "123-45-6789",
    "4111 1111 1111 1111",
    "10.20.30.40",
];

// ============================================================================
// Documented scenarios
// ============================================================================

#[test]
fn test_generic_replaces_with_category_tags() {
    let out = sanitizer()
        .sanitize(
            "Contact john@example.com or call 555-123-4567",
            RedactionMode::Generic,
        )
        .unwrap();
    assert_eq!(out, "Contact [REDACTED_EMAIL] or call [REDACTED_PHONE]");
}

#[test]
fn test_mask_keeps_segment_initials() {
    let out = sanitizer()
        .sanitize("john@example.com", RedactionMode::Mask)
        .unwrap();
    assert_eq!(out, "j***@e***.c***");
}

#[test]
fn test_remove_collapses_trailing_space() {
    let out = sanitizer()
        .sanitize("My SSN is 123-45-6789", RedactionMode::Remove)
        .unwrap();
    assert_eq!(out, "My SSN is");
    assert!(!out.chars().any(|c| c.is_ascii_digit()));
}

#[test]
fn test_repeated_email_in_paragraph_is_reported_as_duplicate() {
    let text = "Send the file to jane.roe@example.com today. Then ping jane.roe@example.com again.";
    let report = sanitizer().report(text, RedactionMode::Generic).unwrap();

    assert_eq!(
        report.output_text,
        "Send the file to [REDACTED_EMAIL] today. Then ping [REDACTED_EMAIL] again."
    );
    assert_eq!(report.spans_found.len(), 2);
    assert_eq!(report.entities_found.len(), 1);

    let view = &report.entities_found[0];
    assert_eq!(view.primary_spans, vec![0]);
    assert_eq!(
        view.duplicates,
        vec![Duplicate {
            span: 1,
            duplicate_of: 0
        }]
    );
    assert_eq!(report.summary.unique_values, 1);
    assert_eq!(report.summary.duplicate_mentions, 1);
}

#[test]
fn test_text_without_pii_is_unchanged() {
    let sanitizer = sanitizer();
    let text = "The weather report looks fine for the weekend.";
    assert!(sanitizer.detect(text).unwrap().is_empty());
    for mode in RedactionMode::ALL {
        assert_eq!(sanitizer.sanitize(text, mode).unwrap(), text);
    }
}

// ============================================================================
// Leak checks
// ============================================================================

#[test]
fn test_canaries_never_survive_any_mode() {
    let sanitizer = sanitizer();
    let spans = sanitizer.detect(CANARY_DOCUMENT).unwrap();
    assert_eq!(spans.len(), CANARIES.len());

    for mode in RedactionMode::ALL {
        let out = sanitizer.sanitize(CANARY_DOCUMENT, mode).unwrap();
        for canary in CANARIES {
            assert!(!out.contains(canary), "{} leaked under {}: {}", canary, mode, out);
        }
        assert_eq!(out.lines().count(), CANARY_DOCUMENT.lines().count());
    }
}

#[test]
fn test_mask_output_per_category() {
    let out = sanitizer()
        .sanitize(CANARY_DOCUMENT, RedactionMode::Mask)
        .unwrap();
    assert!(out.contains("name: J*** R***"));
    assert!(out.contains("j***.r***@e***.c***"));
    assert!(out.contains("***-***-4567"));
    assert!(out.contains("***-**-****"));
    assert!(out.contains("4111 **** **** 1111"));
    assert!(out.contains("10.***.***.***"));
}

#[test]
fn test_bare_ssn_is_redacted() {
    let out = sanitizer()
        .sanitize("social security 123456789 on file", RedactionMode::Generic)
        .unwrap();
    assert_eq!(out, "social security [REDACTED_SSN] on file");
}

// ============================================================================
// Entities and reporting
// ============================================================================

#[test]
fn test_name_and_phone_cluster_ip_stays_alone() {
    let text = "Dr. Jane Roe can be reached at 555-123-4567.\n\nServer 10.20.30.40 is down.";
    let report = sanitizer().report(text, RedactionMode::Generic).unwrap();

    assert_eq!(report.spans_found.len(), 3);
    assert_eq!(report.entities_found.len(), 2);
    assert!(report.entities_found[0].entity.is_cluster());
    assert_eq!(report.entities_found[0].entity.members(), &[0, 1]);
    assert!(!report.entities_found[1].entity.is_cluster());
    assert_eq!(report.summary.cluster_count, 1);
    assert_eq!(report.summary.categories.get(&Category::Ip), Some(&1));

    // Clustering never gates redaction.
    assert_eq!(
        report.output_text,
        "Dr. [REDACTED_NAME] can be reached at [REDACTED_PHONE].\n\nServer [REDACTED_IP] is down."
    );
}

#[test]
fn test_same_value_in_separate_paragraphs_is_linked() {
    let text = "Billing: jane.roe@example.com\n\nShipping: jane.roe@example.com";
    let report = sanitizer().report(text, RedactionMode::Generic).unwrap();

    assert_eq!(report.entities_found.len(), 2);
    assert_eq!(report.value_links.len(), 1);
    assert_eq!(report.value_links[0].category, Category::Email);
    assert_eq!(report.value_links[0].entities, vec![0, 1]);
    assert_eq!(report.summary.unique_values, 1);
    assert_eq!(report.entity_of(1).map(|v| v.entity.id()), Some(1));
}

#[test]
fn test_report_serializes() {
    let report = sanitizer()
        .report("call 555-123-4567", RedactionMode::Mask)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["schema_version"], "1.0.0");
    assert_eq!(json["redaction_policy"], "MASK");
    assert_eq!(json["original_length"], 17);
    assert_eq!(json["output_text"], "call ***-***-4567");
    assert_eq!(json["spans_found"][0]["category"], "PHONE");
    assert_eq!(json["summary"]["categories"]["PHONE"], 1);
    assert!(json["config"]["config_hash"].is_string());
}

// ============================================================================
// Recognizers
// ============================================================================

#[test]
fn test_custom_recognizer_is_used() {
    let recognizer = Arc::new(WordListRecognizer(vec!["Alice"]));
    let sanitizer = Sanitizer::with_recognizer(patient_config(), recognizer).unwrap();
    assert_eq!(sanitizer.recognizer_name(), "word-list");

    let out = sanitizer
        .sanitize("Alice wrote to bob@example.org", RedactionMode::Generic)
        .unwrap();
    assert_eq!(out, "[REDACTED_NAME] wrote to [REDACTED_EMAIL]");
}

#[test]
fn test_hanging_recognizer_degrades_to_patterns() {
    let mut config = SanitizerConfig::default();
    config.ner.timeout_ms = 50;
    let sanitizer = Sanitizer::with_recognizer(config, Arc::new(HangingRecognizer)).unwrap();

    let report = sanitizer
        .report("call 555-123-4567", RedactionMode::Generic)
        .unwrap();
    assert_eq!(report.output_text, "call [REDACTED_PHONE]");
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].detector, "hanging");
    assert_eq!(report.degraded[0].error_code, 30);
}

#[test]
fn test_panicking_recognizer_degrades_to_patterns() {
    let sanitizer =
        Sanitizer::with_recognizer(patient_config(), Arc::new(PanickingRecognizer)).unwrap();
    let report = sanitizer
        .report("ip 10.20.30.40", RedactionMode::Remove)
        .unwrap();
    assert_eq!(report.output_text, "ip");
    assert!(report.is_degraded());
    assert_eq!(report.degraded[0].detector, "panicking");
    assert_eq!(report.degraded[0].error_code, 30);
    assert!(report.degraded[0].reason.contains("model crashed"));
}

#[test]
fn test_undetected_copy_of_detected_value_is_redacted() {
    let sanitizer = sanitizer();
    let text = "Call 555-123-4567 or 555-123-4567x89";

    let out = sanitizer.sanitize(text, RedactionMode::Generic).unwrap();
    assert_eq!(out, "Call [REDACTED_PHONE] or [REDACTED_PHONE]x89");

    let out = sanitizer.sanitize(text, RedactionMode::Remove).unwrap();
    assert!(!out.contains("555-123-4567"), "{out}");
    assert!(out.starts_with("Call"));
    assert!(out.ends_with("x89"));

    let report = sanitizer.report(text, RedactionMode::Mask).unwrap();
    assert_eq!(report.spans_found.len(), 2);
    assert_eq!(report.output_text, "Call ***-***-4567 or ***-***-4567x89");
}

#[test]
fn test_labelled_drivers_license_is_redacted() {
    let sanitizer = sanitizer();
    let out = sanitizer
        .sanitize("driver's license D1234567 on file", RedactionMode::Generic)
        .unwrap();
    assert_eq!(out, "driver's license [REDACTED_DRIVERS_LICENSE] on file");

    let out = sanitizer
        .sanitize("DL: CA12345", RedactionMode::Mask)
        .unwrap();
    assert_eq!(out, "DL: ****");

    // Same shape without a label stays.
    let text = "order D1234567 shipped";
    assert_eq!(sanitizer.sanitize(text, RedactionMode::Generic).unwrap(), text);
}

#[test]
fn test_sanitizer_shared_across_threads() {
    let sanitizer = Arc::new(sanitizer());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sanitizer = Arc::clone(&sanitizer);
            std::thread::spawn(move || {
                sanitizer
                    .sanitize(CANARY_DOCUMENT, RedactionMode::Generic)
                    .unwrap()
            })
        })
        .collect();
    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_unsupported_policy_name() {
    let err = sanitizer().sanitize_str("a@b.co", "hash").unwrap_err();
    assert!(matches!(err, Error::UnsupportedPolicy(_)));
}

#[test]
fn test_config_file_templates_and_toggles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sanitizer.json");
    std::fs::write(
        &path,
        r#"{
            "templates": { "EMAIL": { "tag": "<{category}>", "mask": "fixed" } },
            "ner": { "enabled": false }
        }"#,
    )
    .unwrap();

    let sanitizer = Sanitizer::load(Some(&path)).unwrap();
    assert_eq!(
        sanitizer.sanitize("mail a@b.co", RedactionMode::Generic).unwrap(),
        "mail <EMAIL>"
    );
    assert_eq!(
        sanitizer.sanitize("mail a@b.co", RedactionMode::Mask).unwrap(),
        "mail ****"
    );

    // NER is off, so the titled name stays.
    assert_eq!(
        sanitizer.sanitize("Dr. Jane Roe", RedactionMode::Generic).unwrap(),
        "Dr. Jane Roe"
    );

    let report = sanitizer.report("mail a@b.co", RedactionMode::Generic).unwrap();
    assert_eq!(report.config.config_source, "explicit path");
    assert!(!report.config.summary.ner_enabled);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sanitizer.json");
    std::fs::write(&path, r#"{ "proximity": { "bonus": 0.5, "max_bonus": 0.2 } }"#).unwrap();

    let err = Sanitizer::load(Some(&path)).unwrap_err();
    assert_eq!(err.category(), pii_common::ErrorCategory::Config);
}

#[test]
fn test_default_threshold_filters_weak_candidates() {
    let mut config = patient_config();
    config.default_threshold = 0.95;
    let sanitizer = Sanitizer::new(config).unwrap();

    let spans = sanitizer
        .detect("Dr. Jane Roe\ncard exp 09/27\nmail a@b.co")
        .unwrap();
    let categories: Vec<Category> = spans.iter().map(|s| s.category).collect();
    assert_eq!(categories, vec![Category::Email]);
}
