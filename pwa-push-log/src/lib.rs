//! Logging setup for pwa-push binaries.
//!
//! Library code logs through `tracing`; this crate installs the subscriber,
//! configured from the environment.
//!
//! # Environment Variables
//!
//! - `PWA_PUSH_DEBUG=1` - Enable debug logging
//! - `PWA_PUSH_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `PWA_PUSH_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `PWA_PUSH_LOG_COLOR=1|0` - Enable/disable colors
//! - `RUST_LOG` - Full filter directives, overriding the level
//!
//! # Usage
//!
//! ```rust,no_run
//! pwa_push_log::init();
//! tracing::info!(subscriptions = 3, "Dispatching");
//! ```

use std::env;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
    /// No logging
    Off,
}

impl Level {
    /// Parse a level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "off" | "none" => Some(Self::Off),
            _ => None,
        }
    }

    /// Filter directive for this level.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl Format {
    /// Parse a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Debug mode; lowers the default level to `Debug`
    pub debug: bool,
    /// Minimum level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// ANSI colors
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Compact,
            color: false,
        }
    }
}

impl LogConfig {
    /// Read the `PWA_PUSH_*` logging variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let debug = flag("PWA_PUSH_DEBUG").unwrap_or(false);

        let level = lookup("PWA_PUSH_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("PWA_PUSH_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or_default();

        let color = flag("PWA_PUSH_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            debug,
            level,
            format,
            color: color && format != Format::Json,
        }
    }

    /// Set the level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Default filter when `RUST_LOG` is unset.
    ///
    /// HTTP stack internals stay at `info` in debug mode.
    pub fn filter_directive(&self) -> String {
        match self.level {
            Level::Trace | Level::Debug => {
                format!("{},hyper=info,hyper_util=info,rustls=info", self.level)
            }
            level => level.to_string(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.filter_directive()))
    }
}

// ============================================================================
// Subscriber Installation
// ============================================================================

/// The global subscriber could not be installed.
#[derive(Debug, Error)]
#[error("Failed to install log subscriber: {0}")]
pub struct InitError(String);

/// Install the global subscriber for `config`.
pub fn try_init_with(config: &LogConfig) -> Result<(), InitError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(config.color);

    let result = match config.format {
        Format::Pretty => builder.pretty().try_init(),
        Format::Compact => builder.compact().try_init(),
        Format::Json => builder.json().try_init(),
    };

    result.map_err(|e| InitError(e.to_string()))
}

/// Install the global subscriber from the environment.
pub fn try_init() -> Result<(), InitError> {
    try_init_with(&LogConfig::from_env())
}

/// Like [`try_init`], ignoring an already installed subscriber.
pub fn init() {
    let _ = try_init();
}

// ============================================================================
// Tests
// ============================================================================
