//! Query routing
//!
//! The [`Coordinator`] classifies each user query with the LLM, decodes the
//! [`RoutingDecision`] (falling back to the default agent when the output is
//! unreadable) and dispatches to a registered agent.

pub mod conversation;
pub mod coordinator;
pub mod decision;
pub mod prompt;

pub use conversation::{ConversationLog, ConversationTurn, TurnRole};
pub use coordinator::{AgentCallCount, Coordinator, CoordinatorSettings, CoordinatorStats};
pub use decision::{decode_decision, find_json_object, strip_code_fence, DecodeOutcome, RoutingDecision};
pub use prompt::{build_classification_prompt, PromptContext};
