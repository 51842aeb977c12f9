//! Property tests for decision decoding and cache key normalization

use course_advisor::agent::{cache_key, params};
use course_advisor::routing::{decode_decision, find_json_object, strip_code_fence};
use proptest::prelude::*;

const DEFAULT_AGENT: &str = "CourseAgent";

proptest! {
    #[test]
    fn prop_decode_never_panics(raw in ".*", query in ".*") {
        let outcome = decode_decision(&raw, &query, DEFAULT_AGENT);
        if outcome.is_fallback() {
            prop_assert_eq!(outcome.decision().agent_to_call.as_str(), DEFAULT_AGENT);
        }
    }

    #[test]
    fn prop_text_without_braces_falls_back(raw in "[^{}]*", query in "What is [A-Z]{2,5} [0-9]{3}\\?") {
        let outcome = decode_decision(&raw, &query, DEFAULT_AGENT);

        prop_assert!(outcome.is_fallback());
        let decision = outcome.decision();
        prop_assert_eq!(decision.agent_to_call.as_str(), DEFAULT_AGENT);
        prop_assert_eq!(decision.parameters.get(params::QUESTION), Some(query.as_str()));
    }

    #[test]
    fn prop_decision_found_inside_chatter(
        prefix in "[a-zA-Z .:\n]{0,40}",
        suffix in "[a-zA-Z .\n]{0,40}",
        code in "[A-Z]{2,5} [0-9]{3}",
    ) {
        let json = format!(
            r#"{{"reasoning": "course {{code}}", "agent_to_call": "CourseAgent", "parameters": {{"course_code": "{code}"}}}}"#
        );
        let raw = format!("{prefix}{json}{suffix}");
        let outcome = decode_decision(&raw, "q", "InstructorAgent");

        prop_assert!(!outcome.is_fallback());
        prop_assert_eq!(outcome.decision().parameters.get(params::COURSE_CODE), Some(code.as_str()));
    }

    #[test]
    fn prop_fenced_json_is_unwrapped(body in "[a-z ]{0,30}") {
        let fenced = format!("```json\n{{\"note\": \"{body}\"}}\n```");
        let expected = format!("{{\"note\": \"{body}\"}}");
        let inner = strip_code_fence(&fenced);
        prop_assert_eq!(find_json_object(inner), Some(expected.as_str()));
    }

    #[test]
    fn prop_cache_key_ignores_case_and_spacing(
        qualifier in "[a-zA-Z]{2,10}( [a-zA-Z]{2,10}){0,2}",
        subject in "[a-zA-Z]{2,6} [0-9]{2,3}",
        pad in " {0,3}",
    ) {
        let messy_subject = format!("{pad}{}{pad}", subject.to_lowercase().replace(' ', "  "));
        let messy_qualifier = format!("{pad}{}", qualifier.to_uppercase());

        prop_assert_eq!(
            cache_key(&qualifier, &subject),
            cache_key(&messy_qualifier, &messy_subject)
        );
    }
}
