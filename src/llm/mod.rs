//! LLM provider abstraction layer
//!
//! Provider-agnostic completion interface, the concrete Gemini and OpenAI
//! backends, and the rate-limited gateway every component calls through.

pub mod gateway;
pub mod provider;
pub mod providers;
pub mod rate_limit;

pub use gateway::*;
pub use provider::*;
pub use providers::*;
pub use rate_limit::*;
