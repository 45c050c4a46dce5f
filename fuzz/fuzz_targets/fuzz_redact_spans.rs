//! Fuzz target for the redactor with arbitrary span sets.
//!
//! Spans that do not fit the text must be rejected with an error, never a
//! panic or an out-of-bounds slice.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pii_common::{Category, Source, Span};
use pii_redact::policy::RedactionPolicy;
use pii_redact::{redact, resolve, RedactionMode};

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    ranges: Vec<(u16, u16, u8)>,
    mode: u8,
}

fuzz_target!(|input: Input| {
    let text = input.text.as_str();
    let candidates: Vec<Span> = input
        .ranges
        .iter()
        .take(64)
        .map(|&(start, end, category)| {
            let start = start as usize;
            let end = end as usize;
            Span {
                start,
                end,
                category: Category::ALL[category as usize % Category::ALL.len()],
                source: Source::Pattern,
                confidence: 1.0,
                matched_text: text.get(start..end).unwrap_or_default().to_string(),
            }
        })
        .collect();

    let Ok(resolved) = resolve(text, candidates) else {
        return;
    };
    let mode = RedactionMode::ALL[input.mode as usize % RedactionMode::ALL.len()];
    let policy = RedactionPolicy::builtin(mode);
    redact(text, &resolved, &policy).expect("resolved spans always redact");
});
