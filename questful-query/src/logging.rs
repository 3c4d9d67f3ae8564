//! Logging setup for questful.
//!
//! Parsing, validation and SQL emission report through `tracing`. Nothing is
//! printed unless the host installs a subscriber, or calls [`init`] with the
//! `tracing-subscriber` feature enabled.
//!
//! # Environment Variables
//!
//! - `QUESTFUL_DEBUG=true|1|yes` - log at `debug`
//! - `QUESTFUL_LOG_LEVEL=trace|debug|info|warn|error` - log at that level
//! - `QUESTFUL_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use questful_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

use tracing::Level;

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line, human readable.
    Pretty,
    /// Single-line, human readable.
    Compact,
}

impl LogFormat {
    /// Read `QUESTFUL_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::parse(env::var("QUESTFUL_LOG_FORMAT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("compact") => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// The level requested through the environment, or `None` when logging is
/// not requested at all.
pub fn log_level() -> Option<Level> {
    resolve_level(
        env::var("QUESTFUL_DEBUG").ok().as_deref(),
        env::var("QUESTFUL_LOG_LEVEL").ok().as_deref(),
    )
}

/// An explicit level wins; an unknown one falls back to `QUESTFUL_DEBUG`.
fn resolve_level(debug: Option<&str>, level: Option<&str>) -> Option<Level> {
    let debug = debug.is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"));
    let fallback = if debug { Level::DEBUG } else { Level::WARN };

    match level.map(str::to_ascii_lowercase).as_deref() {
        Some("trace") => Some(Level::TRACE),
        Some("debug") => Some(Level::DEBUG),
        Some("info") => Some(Level::INFO),
        Some("warn") => Some(Level::WARN),
        Some("error") => Some(Level::ERROR),
        Some(_) => Some(fallback),
        None => debug.then_some(fallback),
    }
}

/// Initialize logging from the environment.
///
/// Subsequent calls are no-ops. Does nothing unless `QUESTFUL_DEBUG` or
/// `QUESTFUL_LOG_LEVEL` is set.
pub fn init() {
    if let Some(level) = log_level() {
        init_with_level(level);
    }
}

/// Initialize logging at `level`, ignoring the level variables.
///
/// The format still comes from `QUESTFUL_LOG_FORMAT`.
pub fn init_with_level(level: Level) {
    INIT.call_once(|| install(level, LogFormat::from_env()));
}

#[cfg(feature = "tracing-subscriber")]
fn install(level: Level, format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_new(format!(
        "questful={level},questful_query={level},questful_sql={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    // try_init: the host may already own the global subscriber
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(%level, ?format, "questful logging initialized");
    }
}

#[cfg(not(feature = "tracing-subscriber"))]
fn install(_level: Level, _format: LogFormat) {}
