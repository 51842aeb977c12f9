//! Command-line surface: the interactive loop and its rendering

pub mod display;
pub mod repl;

pub use repl::{run_repl, ReplCommand};
