//! Classification prompt construction

use super::conversation::ConversationTurn;
use crate::agent::AgentRegistry;

/// Everything the classifier sees besides the query itself
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub registry: &'a AgentRegistry,
    pub cache_keys: &'a [String],
    pub last_action: Option<&'a str>,
    pub history: &'a [ConversationTurn],
    /// Institution assumed for course questions that name none
    pub default_university: &'a str,
}

fn format_agents(registry: &AgentRegistry) -> String {
    if registry.is_empty() {
        return "No agents are currently available.".to_string();
    }
    registry
        .iter()
        .map(|agent| format!("- {}: {}", agent.name, agent.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = history
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect();
    format!("RECENT CONVERSATION:\n{}", lines.join("\n"))
}

/// Build the routing classification prompt (pure function)
pub fn build_classification_prompt(context: &PromptContext<'_>, user_query: &str) -> String {
    let cached = if context.cache_keys.is_empty() {
        "None".to_string()
    } else {
        context.cache_keys.join(", ")
    };
    let default_university = context.default_university;

    format!(
        r#"You are the Root Course Advisor Agent. Your role is to help university students by routing each question to a specialized agent.

AVAILABLE AGENTS:
{agents}

CURRENT CONTEXT:
- Cached Lookups: {cached}
- Last Action: {last_action}

{history}

USER QUERY: {user_query}

INSTRUCTIONS:
1. Analyze the user's query and the context above
2. Extract the professor name AND the university (both are required by InstructorAgent)
3. Decide which agent to call
4. Return a JSON object with this structure:

{{
    "reasoning": "Brief explanation of your decision",
    "agent_to_call": "Name of the agent to call, or 'none' if you can answer directly",
    "parameters": {{
        "course_code": "...",
        "professor_name": "...",
        "university": "...",
        "question": "..."
    }},
    "direct_response": "If no agent is needed, the reply goes here"
}}

RULES FOR INSTRUCTOR QUERIES:
- Extract the professor name WITHOUT titles ("Richard Sutton", not "Professor Richard Sutton" or "Dr. Richard Sutton")
- Extract the FULL university name ("University of Alberta", not "Alberta"; "Stanford University", not "Stanford")
- If no university is mentioned, set university to null
- If the professor name is not clear, set professor_name to null
- If the user pastes a RateMyProfessors link, put it in "profile_url"

EXTRACTION EXAMPLES:
- "Tell me about Professor Richard Sutton at University of Alberta"
  -> professor_name: "Richard Sutton", university: "University of Alberta"
- "How is Andrew Ng from Stanford?"
  -> professor_name: "Andrew Ng", university: "Stanford University"
- "What are Mike Horowitz's ratings?"
  -> professor_name: "Mike Horowitz", university: null
- "Professor at Alberta"
  -> professor_name: null, university: "University of Alberta"

RULES FOR COURSE QUERIES:
- Extract the course code ("CMPUT 174", "MATH 100")
- The default university for course queries is "{default_university}"
- Call CourseAgent for any course-related question

GENERAL RULES:
- Set a parameter to null when it is missing or unclear; never guess
- The agents will ask the user for anything that is missing

Return ONLY the JSON, no other text."#,
        agents = format_agents(context.registry),
        last_action = context.last_action.unwrap_or("None"),
        history = format_history(context.history),
    )
}
