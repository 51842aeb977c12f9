//! LLM provider implementations
//!
//! Concrete implementations of the LlmProvider trait for the services the
//! advisor can classify and answer with.

pub mod gemini;
pub mod openai;

pub use gemini::*;
pub use openai::*;
