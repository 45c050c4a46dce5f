//! Fixed-grammar PII detection.
//!
//! Each category has one or more pre-compiled grammars. Grammars are
//! compiled once on first use and never mutated afterwards. Matches are
//! anchored manually: the `regex` crate has no look-around, so a candidate
//! is rejected when it touches an alphanumeric character or continues a
//! digit run through a `-`, `.` or `/` joiner.

use once_cell::sync::Lazy;
use pii_common::{Category, Source, Span};
use regex::Regex;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::trace;

/// Confidence assigned to deterministic grammar matches.
pub const PATTERN_CONFIDENCE: f64 = 1.0;

/// `MM/YY` is ambiguous with plain fractions and short dates.
pub const EXPIRATION_DATE_CONFIDENCE: f64 = 0.6;

/// Label-anchored CVVs are reliable but short.
pub const CVV_CONFIDENCE: f64 = 0.9;

/// Detection grammar definition.
struct PatternRule {
    category: Category,
    pattern: Lazy<Regex>,
    /// Capture group holding the PII value; 0 is the whole match.
    group: usize,
    confidence: f64,
    validate: fn(&str) -> bool,
    description: &'static str,
}

// Pre-compiled detection grammars
static PATTERNS: [PatternRule; 8] = [
    PatternRule {
        category: Category::Email,
        pattern: Lazy::new(|| {
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
        }),
        group: 0,
        confidence: PATTERN_CONFIDENCE,
        validate: accept,
        description: "Email address",
    },
    PatternRule {
        category: Category::Phone,
        pattern: Lazy::new(|| {
            Regex::new(r"(?:\+?1[ .-]?)?(?:\(\d{3}\)|\d{3})[ .-]?\d{3}[ .-]?\d{4}").unwrap()
        }),
        group: 0,
        confidence: PATTERN_CONFIDENCE,
        validate: valid_phone,
        description: "NANP phone number",
    },
    PatternRule {
        category: Category::Ssn,
        pattern: Lazy::new(|| Regex::new(r"\b\d{3}[- ]?\d{2}[- ]?\d{4}\b").unwrap()),
        group: 0,
        confidence: PATTERN_CONFIDENCE,
        validate: valid_ssn,
        description: "US social security number",
    },
    PatternRule {
        category: Category::CreditCard,
        pattern: Lazy::new(|| {
            Regex::new(
                r"\b(?:\d{4}[ -]?){3}\d{4}\b|\b\d{4}[ -]?\d{6}[ -]?\d{5}\b|\b\d{13,19}\b",
            )
            .unwrap()
        }),
        group: 0,
        confidence: PATTERN_CONFIDENCE,
        validate: luhn_valid,
        description: "Payment card number (Luhn)",
    },
    PatternRule {
        category: Category::Ip,
        pattern: Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap()),
        group: 0,
        confidence: PATTERN_CONFIDENCE,
        validate: valid_ipv4,
        description: "IPv4 address",
    },
    PatternRule {
        category: Category::Ip,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)[0-9a-f]{0,4}(?::[0-9a-f]{0,4}){2,7}").unwrap()
        }),
        group: 0,
        confidence: PATTERN_CONFIDENCE,
        validate: valid_ipv6,
        description: "IPv6 address",
    },
    PatternRule {
        category: Category::ExpirationDate,
        pattern: Lazy::new(|| Regex::new(r"\b(?:0[1-9]|1[0-2])/\d{2}\b").unwrap()),
        group: 0,
        confidence: EXPIRATION_DATE_CONFIDENCE,
        validate: accept,
        description: "Card expiration date (MM/YY)",
    },
    PatternRule {
        category: Category::Cvv,
        pattern: Lazy::new(|| {
            Regex::new(
                r#"(?i)\b(?:cvv2?|cvc2?|cid|security\s+code)\s*(?:[:#=]|is)?\s*['"]?(\d{3,4})\b"#,
            )
            .unwrap()
        }),
        group: 1,
        confidence: CVV_CONFIDENCE,
        validate: accept,
        description: "Labelled card verification value",
    },
];

/// Run every grammar over `text`.
///
/// Returns all non-overlapping matches per category, ordered by
/// `(start, end, category)`. Different categories may overlap; the span
/// resolver settles those.
pub fn detect_patterns(text: &str) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut by_category: BTreeMap<Category, Vec<Span>> = BTreeMap::new();
    for rule in &PATTERNS {
        let found = scan_rule(rule, text);
        trace!(rule = rule.description, matches = found.len(), "pattern rule scanned");
        by_category.entry(rule.category).or_default().extend(found);
    }

    let mut spans: Vec<Span> = by_category
        .into_values()
        .flat_map(non_overlapping_in_category)
        .collect();
    spans.sort_by(|a, b| {
        (a.start, a.end, a.category).cmp(&(b.start, b.end, b.category))
    });
    spans
}

fn scan_rule(rule: &PatternRule, text: &str) -> Vec<Span> {
    let mut found = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(caps) = rule.pattern.captures_at(text, pos) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        let value = caps.get(rule.group).unwrap_or(whole);

        let accepted = !value.as_str().is_empty()
            && (rule.validate)(value.as_str())
            && is_isolated(text, value.start(), value.end());

        if accepted {
            if let Ok(span) = Span::new(
                text,
                value.start(),
                value.end(),
                rule.category,
                Source::Pattern,
                rule.confidence,
            ) {
                found.push(span);
            }
            pos = whole.end().max(next_char(text, whole.start()));
        } else {
            // A rejected match may hide a valid one starting inside it.
            pos = next_char(text, whole.start());
        }
    }

    found
}

/// Keep the leftmost (then longest) span wherever a category overlaps itself.
fn non_overlapping_in_category(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.len().cmp(&a.len())));
    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().map_or(true, |last| last.end <= span.start) {
            kept.push(span);
        }
    }
    kept
}

fn next_char(text: &str, from: usize) -> usize {
    from + text[from..].chars().next().map_or(1, char::len_utf8)
}

/// True when `text[start..end]` is not glued to surrounding word characters
/// or to a longer digit run.
pub(crate) fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let mut before = text[..start].chars().rev();
    let ok_before = match before.next() {
        None => true,
        Some(c) if c.is_alphanumeric() || c == '_' => false,
        Some(c) if is_joiner(c) => !before.next().is_some_and(|p| p.is_ascii_digit()),
        Some(_) => true,
    };

    let mut after = text[end..].chars();
    let ok_after = match after.next() {
        None => true,
        Some(c) if c.is_alphanumeric() || c == '_' => false,
        Some(c) if is_joiner(c) => !after.next().is_some_and(|n| n.is_ascii_digit()),
        Some(_) => true,
    };

    ok_before && ok_after
}

fn is_joiner(c: char) -> bool {
    matches!(c, '-' | '.' | '/')
}

fn accept(_: &str) -> bool {
    true
}

fn digits_of(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn valid_phone(value: &str) -> bool {
    let digits = digits_of(value);
    match digits.len() {
        10 => true,
        11 => digits[0] == 1,
        _ => false,
    }
}

/// Structural SSN check: consistent separators, and no all-zero field,
/// `666` or `9xx` area (never issued).
pub fn valid_ssn(value: &str) -> bool {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 9 {
        return false;
    }

    let separators: Vec<char> = value.chars().filter(|c| !c.is_ascii_digit()).collect();
    match separators.as_slice() {
        [] => {}
        [a, b] if a == b => {}
        _ => return false,
    }

    let (area, rest) = digits.split_at(3);
    let (group, serial) = rest.split_at(2);
    area != "000" && area != "666" && !area.starts_with('9') && group != "00" && serial != "0000"
}

/// Luhn checksum over the digits of `value` (13 to 19 digits, not all zero).
pub fn luhn_valid(value: &str) -> bool {
    let digits = digits_of(value);
    if !(13..=19).contains(&digits.len()) || digits.iter().all(|&d| d == 0) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

fn valid_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

fn valid_ipv6(value: &str) -> bool {
    // Requiring a decimal digit keeps words like "ace::" out.
    value.chars().any(|c| c.is_ascii_digit()) && value.parse::<Ipv6Addr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(text: &str) -> Vec<(Category, String)> {
        detect_patterns(text)
            .into_iter()
            .map(|s| (s.category, s.matched_text))
            .collect()
    }

    #[test]
    fn test_detect_email_and_phone() {
        let found = categories("Contact john@example.com or call 555-123-4567");
        assert_eq!(
            found,
            vec![
                (Category::Email, "john@example.com".to_string()),
                (Category::Phone, "555-123-4567".to_string()),
            ]
        );
    }

    #[test]
    fn test_phone_variants() {
        for phone in [
            "555-123-4567",
            "(555) 123-4567",
            "555.123.4567",
            "5551234567",
            "+1 555 123 4567",
            "1-555-123-4567",
        ] {
            let text = format!("call {} today", phone);
            let found = categories(&text);
            assert!(
                found.contains(&(Category::Phone, phone.to_string())),
                "missed {phone}: {found:?}"
            );
        }
    }

    #[test]
    fn test_phone_not_inside_longer_digit_run() {
        assert!(categories("order 123456789012345 shipped")
            .iter()
            .all(|(c, _)| *c != Category::Phone));
        assert!(categories("ref 555-123-4567-89")
            .iter()
            .all(|(c, _)| *c != Category::Phone));
        assert!(categories("id x5551234567").is_empty());
    }

    #[test]
    fn test_ssn_with_and_without_dashes() {
        assert_eq!(
            categories("My SSN is 123-45-6789"),
            vec![(Category::Ssn, "123-45-6789".to_string())]
        );
        assert_eq!(
            categories("ssn 123 45 6789"),
            vec![(Category::Ssn, "123 45 6789".to_string())]
        );
        assert_eq!(
            categories("ssn 123456789"),
            vec![(Category::Ssn, "123456789".to_string())]
        );
    }

    #[test]
    fn test_ssn_structural_rules() {
        assert!(valid_ssn("123-45-6789"));
        assert!(!valid_ssn("000-45-6789"));
        assert!(!valid_ssn("666-45-6789"));
        assert!(!valid_ssn("923-45-6789"));
        assert!(!valid_ssn("123-00-6789"));
        assert!(!valid_ssn("123-45-0000"));
        assert!(!valid_ssn("123-45 6789"));
        // ZIP+4 shape has a single separator
        assert!(!valid_ssn("12345-6789"));
    }

    #[test]
    fn test_credit_card_requires_luhn() {
        assert!(luhn_valid("4111 1111 1111 1111"));
        assert!(luhn_valid("4111-1111-1111-1111"));
        assert!(luhn_valid("378282246310005"));
        assert!(!luhn_valid("4111 1111 1111 1112"));
        assert!(!luhn_valid("0000 0000 0000 0000"));
        assert!(!luhn_valid("4111"));

        assert_eq!(
            categories("card 4111 1111 1111 1111 on file"),
            vec![(Category::CreditCard, "4111 1111 1111 1111".to_string())]
        );
        assert!(categories("card 4111 1111 1111 1112 on file").is_empty());
    }

    #[test]
    fn test_card_found_after_rejected_prefix() {
        let text = "call 555-123-4567 4111 1111 1111 1111";
        let found = categories(text);
        assert!(found.contains(&(Category::Phone, "555-123-4567".to_string())));
        assert!(found.contains(&(Category::CreditCard, "4111 1111 1111 1111".to_string())));
    }

    #[test]
    fn test_ipv4_and_ipv6() {
        assert_eq!(
            categories("host 192.168.1.10 is up"),
            vec![(Category::Ip, "192.168.1.10".to_string())]
        );
        assert!(categories("version 1.2.3.4.5").is_empty());
        assert!(categories("bad 300.1.1.1 addr").is_empty());

        let found = categories("link fe80::1ff:fe23:4567:890a and 2001:db8::8a2e:370:7334");
        assert_eq!(
            found,
            vec![
                (Category::Ip, "fe80::1ff:fe23:4567:890a".to_string()),
                (Category::Ip, "2001:db8::8a2e:370:7334".to_string()),
            ]
        );
    }

    #[test]
    fn test_times_are_not_ipv6() {
        assert!(categories("meet at 12:30:45 sharp").is_empty());
        assert!(categories("the ace:: token").is_empty());
    }

    #[test]
    fn test_expiration_and_cvv() {
        let spans = detect_patterns("exp 09/27 cvv: 123");
        let exp = spans
            .iter()
            .find(|s| s.category == Category::ExpirationDate)
            .unwrap();
        assert_eq!(exp.matched_text, "09/27");
        assert_eq!(exp.confidence, EXPIRATION_DATE_CONFIDENCE);

        let cvv = spans.iter().find(|s| s.category == Category::Cvv).unwrap();
        assert_eq!(cvv.matched_text, "123");
        assert_eq!(cvv.confidence, CVV_CONFIDENCE);
    }

    #[test]
    fn test_full_date_is_not_expiration() {
        assert!(categories("born 01/05/1990")
            .iter()
            .all(|(c, _)| *c != Category::ExpirationDate));
    }

    #[test]
    fn test_offsets_match_text() {
        let text = "é john@example.com ü 555-123-4567";
        for span in detect_patterns(text) {
            assert_eq!(&text[span.start..span.end], span.matched_text);
            assert_eq!(span.source, Source::Pattern);
        }
    }

    #[test]
    fn test_output_is_sorted_and_non_overlapping_per_category() {
        let text = "a@b.co c@d.org 555-123-4567 555-765-4321 10.0.0.1 10.0.0.2";
        let spans = detect_patterns(text);
        assert!(spans.windows(2).all(|w| w[0].start <= w[1].start));
        for category in Category::ALL {
            let same: Vec<_> = spans.iter().filter(|s| s.category == category).collect();
            assert!(same.windows(2).all(|w| w[0].end <= w[1].start));
        }
        assert_eq!(spans.len(), 6);
    }

    #[test]
    fn test_no_pii() {
        assert!(detect_patterns("").is_empty());
        assert!(detect_patterns("nothing sensitive here, just words").is_empty());
    }
}
