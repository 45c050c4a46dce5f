//! Fuzz target for sanitizer.json parsing and validation.
//!
//! Arbitrary JSON must parse to an error or a config; a config that passes
//! validation must build a sanitizer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pii_config::{validate_config, SanitizerConfig};
use pii_redact::Sanitizer;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<SanitizerConfig>(data) else {
        return;
    };
    if validate_config(&config).is_ok() {
        assert!(Sanitizer::new(config).is_ok());
    }
});
