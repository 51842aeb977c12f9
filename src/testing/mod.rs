//! Testing utilities and mock implementations
//!
//! Mocks for the LLM provider, the scraper gateway and agents, so the
//! coordinator can be exercised without API keys or network access.

pub mod mocks;

pub use mocks::*;
