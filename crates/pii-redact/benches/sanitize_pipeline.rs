//! Criterion benchmarks for the sanitization pipeline.
//!
//! Benchmarks `detect_patterns`, `resolve`, and end-to-end `sanitize` /
//! `report` over synthetic documents of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pii_redact::{detect_patterns, resolve, RedactionMode, Sanitizer, SanitizerConfig};

// ── Helpers ──────────────────────────────────────────────────────────

const RECORD: &str = "Customer Dr. Jane Roe (jane.roe@example.com, 555-123-4567) \
paid with 4111 1111 1111 1111 exp 09/27 cvv: 123 from 192.168.10.20.\n\
Shipping to 742 Evergreen Terrace on January 5, 2024; SSN 123-45-6789.\n\n";

const FILLER: &str = "The quarterly numbers were reviewed and no further action \
was required by the committee at this time.\n";

fn document(records: usize) -> String {
    let mut text = String::with_capacity(records * (RECORD.len() + FILLER.len()));
    for _ in 0..records {
        text.push_str(RECORD);
        text.push_str(FILLER);
    }
    text
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_detect_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_patterns");
    for records in [1, 10, 100] {
        let text = document(records);
        group.bench_with_input(BenchmarkId::from_parameter(records), &text, |b, text| {
            b.iter(|| detect_patterns(black_box(text)))
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let text = document(50);
    let candidates = detect_patterns(&text);
    c.bench_function("resolve/50_records", |b| {
        b.iter(|| resolve(black_box(&text), black_box(candidates.clone())))
    });
}

fn bench_sanitize(c: &mut Criterion) {
    let sanitizer = Sanitizer::with_defaults().expect("default config is valid");
    let mut group = c.benchmark_group("sanitize");
    for records in [1, 10, 100] {
        let text = document(records);
        for mode in RedactionMode::ALL {
            group.bench_with_input(
                BenchmarkId::new(mode.as_str(), records),
                &text,
                |b, text| b.iter(|| sanitizer.sanitize(black_box(text), mode)),
            );
        }
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let mut config = SanitizerConfig::default();
    config.ner.enabled = false;
    let sanitizer = Sanitizer::new(config).expect("config is valid");
    let text = document(20);
    c.bench_function("report/20_records_no_ner", |b| {
        b.iter(|| sanitizer.report(black_box(&text), RedactionMode::Generic))
    });
}

criterion_group!(
    benches,
    bench_detect_patterns,
    bench_resolve,
    bench_sanitize,
    bench_report
);
criterion_main!(benches);
