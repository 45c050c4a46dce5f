//! Redaction policies and per-category replacement rules.

use pii_common::{Category, Error, Result};
use pii_config::{MaskStyle, SanitizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Run of mask characters used for hidden segments.
const MASK_RUN: &str = "***";

/// Replacement for values that a style cannot partially reveal.
const FIXED_MASK: &str = "****";

/// How resolved spans are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RedactionMode {
    /// Replace with `[REDACTED_<CATEGORY>]`
    Generic,
    /// Partial reveal per category
    Mask,
    /// Delete the span
    Remove,
}

impl RedactionMode {
    pub const ALL: [RedactionMode; 3] = [
        RedactionMode::Generic,
        RedactionMode::Mask,
        RedactionMode::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RedactionMode::Generic => "GENERIC",
            RedactionMode::Mask => "MASK",
            RedactionMode::Remove => "REMOVE",
        }
    }
}

impl FromStr for RedactionMode {
    type Err = Error;

    /// Case-insensitive; anything else is `UnsupportedPolicy`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(RedactionMode::Generic),
            "mask" => Ok(RedactionMode::Mask),
            "remove" => Ok(RedactionMode::Remove),
            _ => Err(Error::UnsupportedPolicy(s.to_string())),
        }
    }
}

impl std::fmt::Display for RedactionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one category's spans become.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Replacement {
    Tag(String),
    Mask(MaskStyle),
    Remove,
}

impl Replacement {
    /// Replacement text for `value`.
    pub fn render(&self, value: &str) -> String {
        match self {
            Replacement::Tag(tag) => tag.clone(),
            Replacement::Mask(style) => apply_mask(*style, value),
            Replacement::Remove => String::new(),
        }
    }
}

/// A mode plus the resolved rule for every category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionPolicy {
    pub mode: RedactionMode,
    rules: BTreeMap<Category, Replacement>,
}

impl RedactionPolicy {
    /// Build the rule table for `mode` from the configured templates.
    pub fn from_config(mode: RedactionMode, config: &SanitizerConfig) -> Self {
        let rules = Category::ALL
            .into_iter()
            .map(|category| {
                let rule = match mode {
                    RedactionMode::Generic => Replacement::Tag(config.tag_for(category)),
                    RedactionMode::Mask => Replacement::Mask(config.mask_for(category)),
                    RedactionMode::Remove => Replacement::Remove,
                };
                (category, rule)
            })
            .collect();
        Self { mode, rules }
    }

    /// Built-in templates.
    pub fn builtin(mode: RedactionMode) -> Self {
        Self::from_config(mode, &SanitizerConfig::default())
    }

    pub fn rule_for(&self, category: Category) -> &Replacement {
        // Every category is filled in by the constructors.
        &self.rules[&category]
    }

    pub fn is_remove(&self) -> bool {
        self.mode == RedactionMode::Remove
    }
}

/// Render `value` under `style`.
///
/// A style that would hide nothing (no digits to mask, no segment to keep)
/// falls back to the fixed mask.
pub fn apply_mask(style: MaskStyle, value: &str) -> String {
    let masked = match style {
        MaskStyle::SegmentInitials => mask_segment_initials(value),
        MaskStyle::Digits {
            keep_first,
            keep_last,
        } => mask_digits(value, keep_first, keep_last),
        MaskStyle::FirstSegment => mask_after_first_segment(value),
        MaskStyle::WordInitials => mask_word_initials(value),
        MaskStyle::Fixed => None,
    };
    masked.unwrap_or_else(|| FIXED_MASK.to_string())
}

/// `john@example.com` -> `j***@e***.c***`
fn mask_segment_initials(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len() + 8);
    let mut at_segment_start = true;
    for c in value.chars() {
        if c == '@' || c == '.' {
            out.push(c);
            at_segment_start = true;
        } else if at_segment_start {
            out.push(c);
            out.push_str(MASK_RUN);
            at_segment_start = false;
        }
    }
    Some(out)
}

/// `555-123-4567` with `(0, 4)` -> `***-***-4567`
///
/// If the kept digits would cover the whole value, every digit is masked.
fn mask_digits(value: &str, keep_first: usize, keep_last: usize) -> Option<String> {
    let total = value.chars().filter(char::is_ascii_digit).count();
    if total == 0 {
        return None;
    }
    let (keep_first, keep_last) = if keep_first + keep_last >= total {
        (0, 0)
    } else {
        (keep_first, keep_last)
    };

    let mut seen = 0;
    let out = value
        .chars()
        .map(|c| {
            if !c.is_ascii_digit() {
                return c;
            }
            let index = seen;
            seen += 1;
            if index < keep_first || index >= total - keep_last {
                c
            } else {
                '*'
            }
        })
        .collect();
    Some(out)
}

/// `192.168.1.1` -> `192.***.***.***`, `2001:db8::1` -> `2001:***::***`
fn mask_after_first_segment(value: &str) -> Option<String> {
    let split = value.find(['.', ':'])?;
    let (head, rest) = value.split_at(split);
    let mut out = String::from(head);
    let mut in_segment = false;
    for c in rest.chars() {
        if c == '.' || c == ':' {
            out.push(c);
            in_segment = false;
        } else if !in_segment {
            out.push_str(MASK_RUN);
            in_segment = true;
        }
    }
    Some(out)
}

/// `John Smith` -> `J*** S***`
fn mask_word_initials(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len() + 8);
    let mut in_word = false;
    for c in value.chars() {
        if c.is_whitespace() {
            out.push(c);
            in_word = false;
        } else if !in_word {
            out.push(c);
            out.push_str(MASK_RUN);
            in_word = true;
        }
    }
    Some(out)
}
