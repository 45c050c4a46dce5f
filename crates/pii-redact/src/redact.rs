//! Offset-safe rewriting of resolved spans.
//!
//! The output is assembled from the untouched segments between span
//! boundaries and one replacement per span, always indexing the original
//! text by original offsets.
//!
//! REMOVE additionally closes the seam a deleted span leaves behind:
//! connector characters (`-`, `/`, `_`, and `.` followed by an alphanumeric)
//! touching the span go with it, and horizontal whitespace on either side
//! collapses to a single space. No space is kept at the start or end of the
//! text, at a line end, after an opening bracket, or before closing
//! punctuation.

use pii_common::{Error, Result};
use tracing::debug;

use crate::policy::RedactionPolicy;
use crate::resolve::ResolvedSpanSet;

/// Rewrite `text` by replacing every span in `resolved` per `policy`.
///
/// Fails with `InternalInconsistency` if the span set is out of order,
/// overlapping, or does not fit `text`.
pub fn redact(text: &str, resolved: &ResolvedSpanSet, policy: &RedactionPolicy) -> Result<String> {
    check_spans(text, resolved)?;

    let out = if policy.is_remove() {
        remove_spans(text, resolved)
    } else {
        replace_spans(text, resolved, policy)
    };

    debug!(
        mode = %policy.mode,
        spans = resolved.len(),
        input_len = text.len(),
        output_len = out.len(),
        "text redacted"
    );
    Ok(out)
}

fn check_spans(text: &str, resolved: &ResolvedSpanSet) -> Result<()> {
    let mut cursor = 0;
    for span in resolved {
        if span.start < cursor {
            return Err(Error::InternalInconsistency(format!(
                "span [{}, {}) starts before the previous span ends at {}",
                span.start, span.end, cursor
            )));
        }
        span.validate_against(text).map_err(|e| {
            Error::InternalInconsistency(format!("resolved span no longer fits the text: {}", e))
        })?;
        cursor = span.end;
    }
    Ok(())
}

fn replace_spans(text: &str, resolved: &ResolvedSpanSet, policy: &RedactionPolicy) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in resolved {
        out.push_str(&text[cursor..span.start]);
        out.push_str(&policy.rule_for(span.category).render(&text[span.start..span.end]));
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn is_horizontal_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_connector(c: char) -> bool {
    matches!(c, '-' | '/' | '_')
}

fn is_closing(c: char) -> bool {
    matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '}' | '\'' | '"')
}

fn is_opening(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

/// Drop connectors at the end of `segment` (it precedes a removed span).
fn strip_trailing_connectors(segment: &str) -> &str {
    segment.trim_end_matches(|c: char| is_connector(c) || c == '.')
}

/// Drop connectors at the start of `segment` (it follows a removed span).
fn strip_leading_connectors(segment: &str) -> &str {
    let mut rest = segment;
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) if is_connector(c) => rest = chars.as_str(),
            Some('.') if chars.next().is_some_and(char::is_alphanumeric) => rest = &rest[1..],
            _ => return rest,
        }
    }
}

/// Builder tracking whether a removed span's seam is still open.
struct Seam {
    out: String,
    open: bool,
    saw_space: bool,
}

impl Seam {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            open: false,
            saw_space: false,
        }
    }

    /// Mark a removed span at the current end of the output.
    fn remove(&mut self) {
        let trimmed = self.out.trim_end_matches(is_horizontal_space).len();
        if trimmed < self.out.len() {
            self.saw_space = true;
            self.out.truncate(trimmed);
        }
        self.open = true;
    }

    fn push(&mut self, segment: &str) {
        if !self.open {
            self.out.push_str(segment);
            return;
        }

        let rest = segment.trim_start_matches(is_horizontal_space);
        if rest.len() < segment.len() {
            self.saw_space = true;
        }
        let Some(next) = rest.chars().next() else {
            // Nothing left to join; the seam stays open.
            return;
        };

        let joins_words = self.out.chars().next_back().is_some_and(|prev| {
            prev != '\n' && prev != '\r' && !is_opening(prev)
        }) && next != '\n'
            && next != '\r'
            && !is_closing(next);
        if self.saw_space && joins_words {
            self.out.push(' ');
        }
        self.out.push_str(rest);
        self.open = false;
        self.saw_space = false;
    }

    /// Push the text between a removed span and whatever follows it.
    ///
    /// Between two removals a gap of only whitespace and connectors is
    /// dropped, so the seam stays open.
    fn push_gap(&mut self, segment: &str, before_span: bool) {
        let mut segment = segment;
        if self.open {
            if segment
                .chars()
                .all(|c| is_horizontal_space(c) || is_connector(c))
            {
                if segment.contains(is_horizontal_space) {
                    self.saw_space = true;
                }
                return;
            }
            segment = strip_leading_connectors(segment);
        }
        if before_span {
            segment = strip_trailing_connectors(segment);
        }
        self.push(segment);
    }

    fn finish(self) -> String {
        self.out
    }
}

fn remove_spans(text: &str, resolved: &ResolvedSpanSet) -> String {
    let mut seam = Seam::new(text.len());
    let mut cursor = 0;

    for span in resolved {
        seam.push_gap(&text[cursor..span.start], true);
        seam.remove();
        cursor = span.end;
    }
    seam.push_gap(&text[cursor..], false);
    seam.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RedactionMode;
    use crate::resolve::resolve;
    use pii_common::{Category, Source, Span};

    fn resolved_for(text: &str, items: &[(&str, Category)]) -> ResolvedSpanSet {
        let mut spans = Vec::new();
        let mut from = 0;
        for (needle, category) in items {
            let start = from + text[from..].find(needle).unwrap();
            spans.push(
                Span::new(text, start, start + needle.len(), *category, Source::Pattern, 1.0)
                    .unwrap(),
            );
            from = start + needle.len();
        }
        resolve(text, spans).unwrap()
    }

    fn run(text: &str, items: &[(&str, Category)], mode: RedactionMode) -> String {
        let resolved = resolved_for(text, items);
        redact(text, &resolved, &RedactionPolicy::builtin(mode)).unwrap()
    }

    #[test]
    fn test_generic_tags() {
        let out = run(
            "Contact john@example.com or call 555-123-4567",
            &[("john@example.com", Category::Email), ("555-123-4567", Category::Phone)],
            RedactionMode::Generic,
        );
        assert_eq!(out, "Contact [REDACTED_EMAIL] or call [REDACTED_PHONE]");
    }

    #[test]
    fn test_mask_email() {
        let out = run(
            "john@example.com",
            &[("john@example.com", Category::Email)],
            RedactionMode::Mask,
        );
        assert_eq!(out, "j***@e***.c***");
    }

    #[test]
    fn test_remove_trailing_span() {
        let out = run(
            "My SSN is 123-45-6789",
            &[("123-45-6789", Category::Ssn)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "My SSN is");
    }

    #[test]
    fn test_remove_before_punctuation() {
        let out = run(
            "My SSN is 123-45-6789.",
            &[("123-45-6789", Category::Ssn)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "My SSN is.");
    }

    #[test]
    fn test_remove_mid_sentence_collapses_space() {
        let out = run(
            "Call 555-123-4567 today",
            &[("555-123-4567", Category::Phone)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "Call today");
    }

    #[test]
    fn test_remove_leading_span() {
        let out = run(
            "a@b.co wrote this",
            &[("a@b.co", Category::Email)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "wrote this");
    }

    #[test]
    fn test_remove_takes_connectors_along() {
        let out = run(
            "ID-555-123-4567/ext",
            &[("555-123-4567", Category::Phone)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "IDext");
        assert!(!out.contains('-'));
    }

    #[test]
    fn test_remove_adjacent_spans_share_one_seam() {
        let out = run(
            "call 555-123-4567 / 555-987-6543 now",
            &[("555-123-4567", Category::Phone), ("555-987-6543", Category::Phone)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "call now");
    }

    #[test]
    fn test_remove_keeps_line_structure() {
        let out = run(
            "email a@b.co\nphone 555-123-4567\n",
            &[("a@b.co", Category::Email), ("555-123-4567", Category::Phone)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "email\nphone\n");
    }

    #[test]
    fn test_remove_inside_brackets() {
        let out = run(
            "reach me ( 555-123-4567 ) soon",
            &[("555-123-4567", Category::Phone)],
            RedactionMode::Remove,
        );
        assert_eq!(out, "reach me () soon");
    }

    #[test]
    fn test_remove_whole_text() {
        let out = run("a@b.co", &[("a@b.co", Category::Email)], RedactionMode::Remove);
        assert_eq!(out, "");
    }

    #[test]
    fn test_no_spans_is_identity() {
        let text = "nothing to see here.";
        let empty = ResolvedSpanSet::default();
        for mode in RedactionMode::ALL {
            let out = redact(text, &empty, &RedactionPolicy::builtin(mode)).unwrap();
            assert_eq!(out, text);
        }
    }

    #[test]
    fn test_multibyte_text_around_spans() {
        let out = run(
            "café → a@b.co ✓",
            &[("a@b.co", Category::Email)],
            RedactionMode::Generic,
        );
        assert_eq!(out, "café → [REDACTED_EMAIL] ✓");
    }

    #[test]
    fn test_span_outside_text_is_internal_inconsistency() {
        let long = "a@b.co and more";
        let resolved = resolved_for(long, &[("more", Category::Name)]);
        let err = redact(
            "a@b.co",
            &resolved,
            &RedactionPolicy::builtin(RedactionMode::Generic),
        )
        .unwrap_err();
        assert_eq!(err.code(), 50);
    }

    fn unchecked_set(text: &str, ranges: &[(usize, usize)]) -> ResolvedSpanSet {
        let spans: Vec<Span> = ranges
            .iter()
            .map(|&(start, end)| {
                Span::new(text, start, end, Category::Phone, Source::Pattern, 1.0).unwrap()
            })
            .collect();
        // Deserializing skips the ordering checks of `resolve`.
        serde_json::from_value(serde_json::to_value(spans).unwrap()).unwrap()
    }

    #[test]
    fn test_overlapping_set_is_internal_inconsistency() {
        let text = "call 555-123-4567 now";
        let resolved = unchecked_set(text, &[(5, 17), (9, 17)]);
        for mode in RedactionMode::ALL {
            let err = redact(text, &resolved, &RedactionPolicy::builtin(mode)).unwrap_err();
            assert_eq!(err.code(), 50);
            assert!(matches!(err, Error::InternalInconsistency(_)));
        }
    }

    #[test]
    fn test_out_of_order_set_is_internal_inconsistency() {
        let text = "call 555-123-4567 or 555-987-6543";
        let resolved = unchecked_set(text, &[(21, 33), (5, 17)]);
        let err = redact(
            text,
            &resolved,
            &RedactionPolicy::builtin(RedactionMode::Generic),
        )
        .unwrap_err();
        assert_eq!(err.code(), 50);
    }

    #[test]
    fn test_connector_helpers() {
        assert_eq!(strip_trailing_connectors("ID-"), "ID");
        assert_eq!(strip_trailing_connectors("see "), "see ");
        assert_eq!(strip_leading_connectors("/ext"), "ext");
        assert_eq!(strip_leading_connectors(". Next"), ". Next");
        assert_eq!(strip_leading_connectors(".org"), "org");
        assert_eq!(strip_leading_connectors("."), ".");
    }
}
