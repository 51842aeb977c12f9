//! Structured logging using the tracing crate
//!
//! Log output always goes to stderr so the conversation printed on stdout is
//! never interleaved with diagnostics.
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: ERROR, WARN, INFO, DEBUG, TRACE (defaults to WARN for the interactive CLI)
//! - `LOG_FORMAT`: json, pretty, compact (defaults to compact)
//! - `LOG_SPANS`: include span open/close events (true/false)
//! - `RUST_LOG`: overrides the filter entirely
//!
//! ```bash
//! LOG_FORMAT=json LOG_LEVEL=DEBUG course-advisor ask "What is CMPUT 174?" 2> advisor.log
//! ```

use std::env;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Structured JSON, one object per line
    Json,
    /// Multi-line, colored
    Pretty,
    /// Single-line, colored
    Compact,
}

impl LogFormat {
    /// Parse log format from string, unknown values fall back to compact
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Parse a level name, case-insensitive (pure function)
pub fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

/// Raise `base` by one level per `-v` flag (pure function)
pub fn level_for_verbosity(base: Level, verbosity: u8) -> Level {
    const ORDER: [Level; 5] = [
        Level::ERROR,
        Level::WARN,
        Level::INFO,
        Level::DEBUG,
        Level::TRACE,
    ];
    let start = ORDER.iter().position(|l| *l == base).unwrap_or(1);
    ORDER[(start + verbosity as usize).min(ORDER.len() - 1)]
}

fn span_events(include_spans: bool) -> FmtSpan {
    if include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Initialize logging with manual configuration
pub fn init_logging(level: Level, format: LogFormat, include_spans: bool) {
    // Dependency noise stays at warn unless RUST_LOG says otherwise
    let filter = match env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        Err(_) => EnvFilter::new(format!(
            "{level},hyper=warn,reqwest=warn,rustls=warn,html5ever=error,article_scraper=warn"
        )),
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events(include_spans)),
            )
            .try_init(),
        LogFormat::Pretty => subscriber
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(true)
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events(include_spans)),
            )
            .try_init(),
        LogFormat::Compact => subscriber
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events(include_spans)),
            )
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}

/// Initialize logging from environment variables plus CLI verbosity
pub fn init_default_logging(verbosity: u8) {
    let base = env::var("LOG_LEVEL")
        .ok()
        .and_then(|l| parse_level(&l))
        .unwrap_or(Level::WARN);

    let format = LogFormat::parse(&env::var("LOG_FORMAT").unwrap_or_default());

    let include_spans = env::var("LOG_SPANS")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    init_logging(level_for_verbosity(base, verbosity), format, include_spans);
}

/// Span covering one conversation turn
#[macro_export]
macro_rules! turn_span {
    ($($field:tt)*) => {
        tracing::info_span!("conversation_turn", $($field)*)
    };
}

/// Span covering one rate-limited LLM gateway call
#[macro_export]
macro_rules! gateway_span {
    ($($field:tt)*) => {
        tracing::info_span!("llm_gateway", $($field)*)
    };
}

/// Span covering a cache lookup or scrape for one agent
#[macro_export]
macro_rules! lookup_span {
    ($($field:tt)*) => {
        tracing::info_span!("source_lookup", $($field)*)
    };
}

pub use {gateway_span, lookup_span, turn_span};
