//! Observability
//!
//! Structured logging to stderr and the span macros used around turns,
//! gateway calls and source lookups.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{gateway_span, lookup_span, turn_span};
