//! Error types for the advisor
//!
//! Each layer has its own error enum (`LlmError`, `ScrapeError`, `ConfigError`,
//! `LookupError`); [`AdvisorError`] wraps them at the agent boundary, with scrape
//! failures carried inside `LookupError`. Text that reaches the user goes
//! through [`sanitize_error_message`] first.

use crate::agent::LookupError;
use crate::config::ConfigError;
use crate::llm::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("{0}")]
    Lookup(#[from] LookupError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Duplicate agent name: {name}")]
    DuplicateAgent { name: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AdvisorError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn duplicate_agent<S: Into<String>>(name: S) -> Self {
        Self::DuplicateAgent { name: name.into() }
    }

    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// One-line, secret-free rendering for the terminal
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*[^\s&]+").expect("valid secret regex")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("valid path regex")
});

const MAX_ERROR_LEN: usize = 500;

/// Redact key-like values and sensitive paths, collapse to one line, cap length
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let sanitized = SENSITIVE_PATH_PATTERN.replace_all(&sanitized, "/***REDACTED***/");
    let mut sanitized = sanitized.split_whitespace().collect::<Vec<_>>().join(" ");

    if sanitized.len() > MAX_ERROR_LEN {
        let suffix = "...[truncated]";
        let mut cut = MAX_ERROR_LEN - suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(suffix);
    }

    sanitized
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;
