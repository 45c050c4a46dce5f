//! Fuzz target for the full sanitization pipeline.
//!
//! Arbitrary text must never panic the engine, and every reported span must
//! be ordered, disjoint, and fit the input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;
use pii_redact::{RedactionMode, Sanitizer};

static SANITIZER: Lazy<Option<Sanitizer>> = Lazy::new(|| Sanitizer::with_defaults().ok());

fuzz_target!(|data: &str| {
    let Some(sanitizer) = SANITIZER.as_ref() else {
        return;
    };

    let Ok(spans) = sanitizer.detect(data) else {
        return;
    };
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start, "overlapping spans");
    }
    for span in &spans {
        assert!(span.start < span.end && span.end <= data.len());
        assert!(data.is_char_boundary(span.start) && data.is_char_boundary(span.end));
    }

    for mode in RedactionMode::ALL {
        let _ = sanitizer.report(data, mode);
    }
});
