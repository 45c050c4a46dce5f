//! Logging bootstrap for embedders of the engine.
//!
//! The engine only emits `tracing` events; installing a subscriber is the
//! caller's choice. [`init_logging`] provides the standard setup:
//! - human-readable output on stderr (ANSI only on a terminal), or
//! - JSON lines on stderr for machine consumers.
//!
//! Events never carry matched text. Fields are limited to categories,
//! offsets, lengths, counts, and detector names.
//!
//! ```no_run
//! use pii_redact::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! ```

use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Level variable; takes precedence over `RUST_LOG`.
pub const ENV_LOG_LEVEL: &str = "PII_LOG";

/// Format variable (`human` or `jsonl`).
pub const ENV_LOG_FORMAT: &str = "PII_LOG_FORMAT";

/// Values of the `event` field on pipeline log events.
pub mod event_names {
    pub const SANITIZE_STARTED: &str = "sanitize.started";
    pub const SANITIZE_FINISHED: &str = "sanitize.finished";

    pub const DETECT_PATTERNS: &str = "detect.patterns";
    pub const DETECT_KEYWORDS: &str = "detect.keywords";
    pub const DETECT_ENTITIES: &str = "detect.entities";

    pub const DETECTOR_DEGRADED: &str = "detector.degraded";
    pub const SPAN_DROPPED: &str = "span.dropped";

    pub const RESOLVE_FINISHED: &str = "resolve.finished";
    pub const REPORT_BUILT: &str = "report.built";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" | "structured" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Human => write!(f, "human"),
            LogFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Minimum level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" | "quiet" => Ok(LogLevel::Off),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
            LogLevel::Off => tracing_subscriber::filter::LevelFilter::OFF,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Timestamps in human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Build from `PII_LOG` / `RUST_LOG` and `PII_LOG_FORMAT`, then apply
    /// explicit overrides.
    pub fn from_env(level: Option<LogLevel>, format: Option<LogFormat>) -> Self {
        Self::from_vars(
            std::env::var(ENV_LOG_LEVEL).ok().as_deref(),
            std::env::var("RUST_LOG").ok().as_deref(),
            std::env::var(ENV_LOG_FORMAT).ok().as_deref(),
        )
        .with_overrides(level, format)
    }

    fn from_vars(pii_log: Option<&str>, rust_log: Option<&str>, format: Option<&str>) -> Self {
        let mut config = LogConfig::default();

        if let Some(val) = pii_log {
            if let Ok(level) = val.parse::<LogLevel>() {
                config.level = level;
            }
        } else if let Some(val) = rust_log {
            // Coarse: the most verbose level mentioned anywhere wins.
            if val.contains("trace") {
                config.level = LogLevel::Trace;
            } else if val.contains("debug") {
                config.level = LogLevel::Debug;
            } else if val.contains("warn") {
                config.level = LogLevel::Warn;
            } else if val.contains("error") {
                config.level = LogLevel::Error;
            }
        }

        if let Some(format) = format.and_then(|v| v.parse::<LogFormat>().ok()) {
            config.format = format;
        }

        config
    }

    fn with_overrides(mut self, level: Option<LogLevel>, format: Option<LogFormat>) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("pii_redact={}", self.level)))
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed; the existing one
/// is left in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());

    let installed = match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Jsonl => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.is_ok()
}
