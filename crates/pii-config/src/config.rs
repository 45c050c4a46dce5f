//! Sanitizer configuration types.
//!
//! Every field has a default so a partial (or empty) `sanitizer.json` is
//! valid. Defaults reproduce the engine's documented behaviour: same-line
//! proximity, accept-all thresholds, bracketed category tags, a 250ms budget
//! for the named-entity detector.

use pii_common::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::validate::{ValidationError, ValidationResult};

/// Tag template used by GENERIC redaction when no override is configured.
pub const DEFAULT_TAG_TEMPLATE: &str = "[REDACTED_{category}]";

/// Top-level sanitizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub proximity: ProximityConfig,

    /// Per-category minimum confidence; candidates below are discarded
    /// before resolution.
    #[serde(default)]
    pub thresholds: BTreeMap<Category, f64>,

    /// Threshold for categories without an explicit entry.
    #[serde(default)]
    pub default_threshold: f64,

    /// Per-category redaction template overrides.
    #[serde(default)]
    pub templates: BTreeMap<Category, TemplateRule>,

    #[serde(default)]
    pub ner: NerConfig,

    #[serde(default)]
    pub graph: GraphConfig,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            proximity: ProximityConfig::default(),
            thresholds: BTreeMap::new(),
            default_threshold: 0.0,
            templates: BTreeMap::new(),
            ner: NerConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

impl SanitizerConfig {
    /// Load configuration from a JSON file (no semantic validation).
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json_str(content: &str) -> ValidationResult<Self> {
        serde_json::from_str(content).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Load and validate.
    pub fn load(path: &Path) -> ValidationResult<Self> {
        let config = Self::from_file(path)?;
        crate::validate::validate_config(&config)?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Minimum confidence a candidate of `category` needs to survive.
    pub fn threshold_for(&self, category: Category) -> f64 {
        self.thresholds
            .get(&category)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    /// GENERIC replacement text for `category`.
    pub fn tag_for(&self, category: Category) -> String {
        let template = self
            .templates
            .get(&category)
            .and_then(|rule| rule.tag.as_deref())
            .unwrap_or(DEFAULT_TAG_TEMPLATE);
        template.replace("{category}", category.as_str())
    }

    /// MASK style for `category`.
    pub fn mask_for(&self, category: Category) -> MaskStyle {
        self.templates
            .get(&category)
            .and_then(|rule| rule.mask)
            .unwrap_or_else(|| MaskStyle::default_for(category))
    }

    /// Set a threshold for one category.
    pub fn set_threshold(&mut self, category: Category, threshold: f64) {
        self.thresholds.insert(category, threshold);
    }
}

/// Proximity analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub window: ProximityWindow,

    /// Confidence added per linked neighbour or nearby label.
    #[serde(default = "default_bonus")]
    pub bonus: f64,

    /// Cap on the total bonus a single span can receive.
    #[serde(default = "default_max_bonus")]
    pub max_bonus: f64,
}

fn default_bonus() -> f64 {
    0.1
}

fn default_max_bonus() -> f64 {
    0.3
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: ProximityWindow::default(),
            bonus: default_bonus(),
            max_bonus: default_max_bonus(),
        }
    }
}

/// How close two spans must be to count as co-located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityWindow {
    /// No line break between the two spans.
    #[default]
    SameLine,
    /// At most this many bytes between the nearer edges of the two spans.
    Chars(usize),
}

impl std::fmt::Display for ProximityWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProximityWindow::SameLine => write!(f, "same_line"),
            ProximityWindow::Chars(n) => write!(f, "chars:{}", n),
        }
    }
}

/// Named-entity detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on how long a detection call waits for the recognizer.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    250
}

impl NerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Entity graph settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// When false every span becomes its own singleton entity.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Override for one category's replacement text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateRule {
    /// GENERIC tag; `{category}` expands to the category name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// MASK style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskStyle>,
}

/// Partial-reveal rule used by MASK redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskStyle {
    /// First character of each `@`/`.`-delimited segment, then `***`.
    SegmentInitials,
    /// Replace digits with `*` except the first/last few; separators stay.
    Digits { keep_first: usize, keep_last: usize },
    /// Keep the first `.`/`:`-delimited segment, mask the rest.
    FirstSegment,
    /// First character of each word, then `***`.
    WordInitials,
    /// Fixed `****` regardless of input.
    Fixed,
}

impl MaskStyle {
    /// Built-in mask style for a category.
    pub fn default_for(category: Category) -> Self {
        match category {
            Category::Email => MaskStyle::SegmentInitials,
            Category::Phone => MaskStyle::Digits {
                keep_first: 0,
                keep_last: 4,
            },
            Category::Ssn => MaskStyle::Digits {
                keep_first: 0,
                keep_last: 0,
            },
            Category::CreditCard => MaskStyle::Digits {
                keep_first: 4,
                keep_last: 4,
            },
            Category::Ip => MaskStyle::FirstSegment,
            Category::Name => MaskStyle::WordInitials,
            Category::Address
            | Category::Date
            | Category::ExpirationDate
            | Category::Cvv
            | Category::DriversLicense => MaskStyle::Fixed,
        }
    }
}
