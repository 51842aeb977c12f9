//! Routing decisions and their tolerant decoding
//!
//! The classifier is asked for a JSON object but models wrap it in code
//! fences, add prose around it, or return something else entirely.
//! [`decode_decision`] never fails: anything it cannot read becomes a
//! deterministic fallback to the default agent.

use crate::agent::{params, AgentParameters, QUOTA_EXHAUSTED_MESSAGE};
use crate::error::sanitize_error_message;
use crate::llm::provider::{JsonSchemaDefinition, LlmError, ResponseFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Agent name meaning "answer directly, call nobody"
pub const NO_AGENT: &str = "none";

/// Reply used when a direct decision carries no text
pub const STATIC_FALLBACK_RESPONSE: &str =
    "I'm not sure how to help with that. Try asking about a specific course or professor.";

fn no_agent() -> String {
    NO_AGENT.to_string()
}

/// Structured output of the routing classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoutingDecision {
    /// Short explanation of the choice (logged, never shown)
    #[serde(default)]
    pub reasoning: String,

    /// Registered agent name, or "none" to answer directly
    #[serde(default = "no_agent")]
    pub agent_to_call: String,

    /// Extracted parameters; unknown values are null
    #[serde(default)]
    pub parameters: AgentParameters,

    /// Reply text when no agent is called
    #[serde(default)]
    pub direct_response: Option<String>,
}

impl RoutingDecision {
    /// Route the raw query to `default_agent` as its question
    pub fn fallback(user_query: &str, default_agent: &str) -> Self {
        Self {
            reasoning: "Fallback routing".to_string(),
            agent_to_call: default_agent.to_string(),
            parameters: AgentParameters::new().with(params::QUESTION, user_query),
            direct_response: None,
        }
    }

    /// Direct reply explaining a gateway failure
    pub fn gateway_failure(error: &LlmError) -> Self {
        let response = if error.is_quota_exhausted() {
            QUOTA_EXHAUSTED_MESSAGE.to_string()
        } else {
            format!(
                "I encountered an error: {}",
                sanitize_error_message(&error.to_string())
            )
        };

        Self {
            reasoning: format!("Error: {}", sanitize_error_message(&error.to_string())),
            agent_to_call: no_agent(),
            parameters: AgentParameters::new(),
            direct_response: Some(response),
        }
    }

    /// `true` when no agent should be called
    pub fn is_direct(&self) -> bool {
        self.agent_to_call.trim().eq_ignore_ascii_case(NO_AGENT)
    }

    /// Direct reply text, or the static fallback when absent or blank
    pub fn direct_text(&self) -> String {
        self.direct_response
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(STATIC_FALLBACK_RESPONSE)
            .to_string()
    }

    /// JSON schema of the decision object
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(RoutingDecision);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Response format for structured-decision gateway calls
    pub fn response_format() -> ResponseFormat {
        ResponseFormat::JsonSchema {
            json_schema: JsonSchemaDefinition {
                name: "routing_decision".to_string(),
                // Parameters are an open map, which strict mode rejects
                strict: Some(false),
                schema: Self::json_schema(),
            },
        }
    }
}

/// Result of decoding classifier output
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Decoded(RoutingDecision),
    Fallback {
        decision: RoutingDecision,
        error: String,
    },
}

impl DecodeOutcome {
    pub fn decision(&self) -> &RoutingDecision {
        match self {
            DecodeOutcome::Decoded(decision) => decision,
            DecodeOutcome::Fallback { decision, .. } => decision,
        }
    }

    pub fn into_decision(self) -> RoutingDecision {
        match self {
            DecodeOutcome::Decoded(decision) => decision,
            DecodeOutcome::Fallback { decision, .. } => decision,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DecodeOutcome::Fallback { .. })
    }
}

/// Remove a surrounding markdown code fence such as ```` ```json ```` (pure function)
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the language tag on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// First balanced `{...}` in the text, ignoring braces inside strings (pure function)
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Only a JSON object is a decision, even though every field has a default
fn decode_object(text: &str) -> Result<RoutingDecision, String> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Decode classifier output, falling back to `default_agent` (pure function)
pub fn decode_decision(raw: &str, user_query: &str, default_agent: &str) -> DecodeOutcome {
    let text = strip_code_fence(raw);

    let error = match decode_object(text) {
        Ok(decision) => return DecodeOutcome::Decoded(decision),
        Err(e) => e,
    };

    if let Some(object) = find_json_object(text) {
        if let Ok(decision) = decode_object(object) {
            debug!("Decoded routing decision embedded in surrounding text");
            return DecodeOutcome::Decoded(decision);
        }
    }

    let preview: String = text.chars().take(200).collect();
    warn!(error = %error, response = %preview, "Unparseable routing decision, using fallback");

    DecodeOutcome::Fallback {
        decision: RoutingDecision::fallback(user_query, default_agent),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "Tell me about CMPUT 174";

    #[test]
    fn test_decode_plain_json() {
        let raw = r#"{"reasoning": "course question", "agent_to_call": "CourseAgent",
            "parameters": {"course_code": "CMPUT 174", "question": "What is it?"},
            "direct_response": null}"#;

        let outcome = decode_decision(raw, QUERY, "CourseAgent");
        let decision = outcome.decision();

        assert!(!outcome.is_fallback());
        assert_eq!(decision.agent_to_call, "CourseAgent");
        assert_eq!(decision.parameters.get("course_code"), Some("CMPUT 174"));
        assert_eq!(decision.direct_response, None);
    }

    #[test]
    fn test_decode_fenced_json() {
        let raw = "```json\n{\"agent_to_call\": \"InstructorAgent\", \"parameters\": {\"professor_name\": \"Richard Sutton\", \"university\": \"unknown\"}}\n```";
        let outcome = decode_decision(raw, QUERY, "CourseAgent");

        assert!(!outcome.is_fallback());
        let decision = outcome.into_decision();
        assert_eq!(decision.agent_to_call, "InstructorAgent");
        assert_eq!(decision.parameters.get("professor_name"), Some("Richard Sutton"));
        assert_eq!(decision.parameters.get("university"), None);
        assert_eq!(decision.reasoning, "");
    }

    #[test]
    fn test_decode_object_inside_prose() {
        let raw = "Sure! Here is the plan: {\"agent_to_call\": \"none\", \"direct_response\": \"Hi {there}\"} Hope that helps.";
        let decision = decode_decision(raw, QUERY, "CourseAgent").into_decision();

        assert!(decision.is_direct());
        assert_eq!(decision.direct_text(), "Hi {there}");
    }

    #[test]
    fn test_garbage_falls_back_to_default_agent() {
        let outcome = decode_decision("I think CourseAgent", QUERY, "CourseAgent");

        match &outcome {
            DecodeOutcome::Fallback { decision, error } => {
                assert_eq!(decision.agent_to_call, "CourseAgent");
                assert_eq!(decision.parameters.get(params::QUESTION), Some(QUERY));
                assert_eq!(decision.parameters.len(), 1);
                assert!(!error.is_empty());
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_shape_falls_back() {
        let outcome = decode_decision(r#"{"parameters": "CMPUT 174"}"#, QUERY, "CourseAgent");
        assert!(outcome.is_fallback());

        let outcome = decode_decision("[1, 2, 3]", QUERY, "CourseAgent");
        assert!(outcome.is_fallback());

        let outcome = decode_decision("[]", QUERY, "CourseAgent");
        assert!(outcome.is_fallback());
    }

    #[test]
    fn test_missing_agent_means_direct() {
        let decision = decode_decision("{}", QUERY, "CourseAgent").into_decision();
        assert!(decision.is_direct());
        assert_eq!(decision.direct_text(), STATIC_FALLBACK_RESPONSE);
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json{}```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_find_json_object() {
        assert_eq!(find_json_object(r#"x {"a": {"b": "}"}} y {"c": 1}"#), Some(r#"{"a": {"b": "}"}}"#));
        assert_eq!(find_json_object(r#"{"a": "\"}"} tail"#), Some(r#"{"a": "\"}"}"#));
        assert_eq!(find_json_object("no braces"), None);
        assert_eq!(find_json_object("{ never closed"), None);
        assert_eq!(find_json_object("} stray { ok }"), Some("{ ok }"));
    }

    #[test]
    fn test_is_direct_is_case_insensitive() {
        let mut decision = RoutingDecision::fallback(QUERY, "None");
        assert!(decision.is_direct());
        decision.agent_to_call = " NONE ".to_string();
        assert!(decision.is_direct());
        decision.agent_to_call = "CourseAgent".to_string();
        assert!(!decision.is_direct());
    }

    #[test]
    fn test_gateway_failure_messages() {
        let quota = RoutingDecision::gateway_failure(&LlmError::RateLimitExceeded("429".into()));
        assert!(quota.is_direct());
        assert_eq!(quota.direct_text(), QUOTA_EXHAUSTED_MESSAGE);

        let network = RoutingDecision::gateway_failure(&LlmError::NetworkError("connection reset".into()));
        assert!(network.direct_text().starts_with("I encountered an error:"));
        assert!(network.direct_text().contains("connection reset"));
    }

    #[test]
    fn test_schema_lists_decision_fields() {
        let schema = RoutingDecision::json_schema();
        assert!(schema["properties"]["agent_to_call"].is_object());
        assert!(schema["properties"]["parameters"].is_object());
        assert!(schema["properties"]["direct_response"].is_object());

        assert!(RoutingDecision::response_format().wants_json());
    }
}
