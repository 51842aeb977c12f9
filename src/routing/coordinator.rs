//! The routing coordinator
//!
//! One [`Coordinator`] serves one interactive session. Each turn is
//! classified through the shared [`ClassifierGateway`], decoded with
//! fallback, and either answered directly or handed to a registered agent.
//! No turn ever fails: gateway, decode and agent problems all end up as
//! reply text, and every turn is logged as one user/assistant exchange.

use super::conversation::ConversationLog;
use super::decision::{decode_decision, RoutingDecision};
use super::prompt::{build_classification_prompt, PromptContext};
use crate::agent::{Agent, AgentRegistry, SourceCache};
use crate::error::AdvisorResult;
use crate::llm::ClassifierGateway;
use crate::turn_span;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Agent used when the classifier output cannot be decoded
    pub default_agent: String,
    /// Turns of history shown to the classifier
    pub history_window: usize,
    pub default_university: String,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            default_agent: "CourseAgent".to_string(),
            history_window: 6,
            default_university: "University of Alberta".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentCallCount {
    pub name: String,
    pub description: String,
    pub calls: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub session_id: Uuid,
    pub total_exchanges: usize,
    pub turns_stored: usize,
    pub cached_entries: usize,
    pub agent_calls: Vec<AgentCallCount>,
}

pub struct Coordinator {
    session_id: Uuid,
    gateway: ClassifierGateway,
    registry: AgentRegistry,
    cache: SourceCache,
    history: ConversationLog,
    last_action: Option<String>,
    settings: CoordinatorSettings,
}

impl Coordinator {
    pub fn new(gateway: ClassifierGateway, cache: SourceCache, settings: CoordinatorSettings) -> Self {
        let session_id = Uuid::new_v4();
        info!(
            session = %session_id,
            provider = gateway.provider_name(),
            model = gateway.model(),
            "Coordinator initialized"
        );

        Self {
            session_id,
            gateway,
            registry: AgentRegistry::new(),
            cache,
            history: ConversationLog::new(),
            last_action: None,
            settings,
        }
    }

    pub fn register_agent(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn Agent>,
    ) -> AdvisorResult<()> {
        self.registry.register(name, description, handler)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    pub fn last_action(&self) -> Option<&str> {
        self.last_action.as_deref()
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Classify a query; never fails
    pub async fn route(&self, user_query: &str) -> RoutingDecision {
        let cache_keys = self.cache.keys();
        let context = PromptContext {
            registry: &self.registry,
            cache_keys: &cache_keys,
            last_action: self.last_action.as_deref(),
            history: self.history.recent(self.settings.history_window),
            default_university: &self.settings.default_university,
        };
        let prompt = build_classification_prompt(&context, user_query);
        debug!(prompt_len = prompt.len(), "Built classification prompt");

        match self
            .gateway
            .classify(&prompt, RoutingDecision::response_format())
            .await
        {
            Ok(raw) => decode_decision(&raw, user_query, &self.settings.default_agent).into_decision(),
            Err(e) => {
                warn!(error = %e, "Classification call failed");
                RoutingDecision::gateway_failure(&e)
            }
        }
    }

    /// Run one full turn and return the reply
    pub async fn execute(&mut self, user_query: &str) -> String {
        let span = turn_span!(
            session = %self.session_id,
            turn = self.history.exchanges() + 1
        );

        async {
            let decision = self.route(user_query).await;
            info!(
                agent = %decision.agent_to_call,
                reasoning = %decision.reasoning,
                parameters = ?decision.parameters.sorted(),
                "Routing decision"
            );

            let response = self.dispatch(decision).await;
            self.history.record_exchange(user_query, response.clone());
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&mut self, decision: RoutingDecision) -> String {
        let name = decision.agent_to_call.trim().to_string();
        if decision.is_direct() {
            return decision.direct_text();
        }

        let Some(handler) = self.registry.record_invocation(&name) else {
            warn!(agent = %name, "Classifier chose an unregistered agent");
            return decision.direct_text();
        };

        match handler.handle(&decision.parameters).await {
            Ok(response) => {
                self.last_action = Some(format!("Called {name}"));
                response
            }
            Err(e) => {
                warn!(agent = %name, error = %e, "Agent call failed");
                format!("Error calling {name}: {}", e.user_message())
            }
        }
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            session_id: self.session_id,
            total_exchanges: self.history.exchanges(),
            turns_stored: self.history.len(),
            cached_entries: self.cache.len(),
            agent_calls: self
                .registry
                .iter()
                .map(|agent| AgentCallCount {
                    name: agent.name.clone(),
                    description: agent.description.clone(),
                    calls: agent.invocation_count,
                })
                .collect(),
        }
    }

    pub fn clear_cache(&self) {
        let cleared = self.cache.len();
        self.cache.clear();
        info!(cleared, "Cache cleared");
    }

    /// Forget the conversation, including pending slot-filling state in agents
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.last_action = None;
        self.registry.reset_all();
        info!("Conversation history cleared");
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("session_id", &self.session_id)
            .field("gateway", &self.gateway)
            .field("agents", &self.registry.names())
            .field("turns", &self.history.len())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::params;
    use crate::llm::{GatewaySettings, LlmError, RateLimiter};
    use crate::testing::mocks::{MockAgent, MockLlmProvider};
    use std::time::Duration;

    fn coordinator(provider: MockLlmProvider) -> (Coordinator, Arc<MockAgent>, Arc<MockAgent>) {
        let gateway = ClassifierGateway::new(
            Arc::new(provider),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            GatewaySettings::default(),
        );
        let mut coordinator =
            Coordinator::new(gateway, SourceCache::new(), CoordinatorSettings::default());

        let course = Arc::new(MockAgent::new("course answer"));
        let instructor = Arc::new(MockAgent::new("instructor answer"));
        coordinator
            .register_agent("CourseAgent", "Course information", course.clone())
            .unwrap();
        coordinator
            .register_agent("InstructorAgent", "Professor ratings", instructor.clone())
            .unwrap();
        (coordinator, course, instructor)
    }

    #[tokio::test]
    async fn test_dispatch_to_named_agent() {
        let (mut coordinator, course, _) = coordinator(MockLlmProvider::single_response(
            r#"{"reasoning": "course", "agent_to_call": "CourseAgent", "parameters": {"course_code": "CMPUT 174", "question": "prereqs?"}}"#,
        ));

        let reply = coordinator.execute("What are the prereqs for CMPUT 174?").await;

        assert_eq!(reply, "course answer");
        let calls = course.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get(params::COURSE_CODE), Some("CMPUT 174"));
        assert_eq!(coordinator.last_action(), Some("Called CourseAgent"));
        assert_eq!(coordinator.agents().get("CourseAgent").unwrap().invocation_count, 1);
    }

    #[tokio::test]
    async fn test_unparseable_output_uses_default_agent() {
        let (mut coordinator, course, instructor) =
            coordinator(MockLlmProvider::single_response("definitely not json"));

        coordinator.execute("Tell me about MATH 125").await;

        let calls = course.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get(params::QUESTION), Some("Tell me about MATH 125"));
        assert!(instructor.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_direct_and_unknown_agents_answer_without_dispatch() {
        let (mut coordinator, course, instructor) = coordinator(MockLlmProvider::new(vec![
            r#"{"agent_to_call": "NONE", "direct_response": "Hello! Ask me about courses."}"#.to_string(),
            r#"{"agent_to_call": "WeatherAgent", "direct_response": ""}"#.to_string(),
        ]));

        assert_eq!(coordinator.execute("hi").await, "Hello! Ask me about courses.");
        assert_eq!(
            coordinator.execute("weather?").await,
            crate::routing::decision::STATIC_FALLBACK_RESPONSE
        );
        assert!(course.calls().await.is_empty());
        assert!(instructor.calls().await.is_empty());
        assert_eq!(coordinator.last_action(), None);
    }

    #[tokio::test]
    async fn test_gateway_failure_becomes_reply() {
        let (mut coordinator, course, _) = coordinator(MockLlmProvider::with_error(
            LlmError::NetworkError("connection refused".to_string()),
        ));

        let reply = coordinator.execute("CMPUT 174?").await;

        assert!(reply.starts_with("I encountered an error:"));
        assert!(course.calls().await.is_empty());
        assert_eq!(coordinator.history().len(), 2);
    }

    #[tokio::test]
    async fn test_agent_error_is_reported_as_text() {
        let (mut coordinator, course, _) = coordinator(MockLlmProvider::single_response(
            r#"{"agent_to_call": "CourseAgent", "parameters": {"course_code": "CMPUT 174"}}"#,
        ));
        course.fail_with("catalogue offline").await;

        let reply = coordinator.execute("CMPUT 174").await;
        assert!(reply.starts_with("Error calling CourseAgent:"));
        assert!(reply.contains("catalogue offline"));
        assert_eq!(coordinator.last_action(), None);
    }

    #[tokio::test]
    async fn test_history_and_stats() {
        let (mut coordinator, _, _) = coordinator(MockLlmProvider::new(vec![
            r#"{"agent_to_call": "CourseAgent", "parameters": {}}"#.to_string(),
            r#"{"agent_to_call": "none", "direct_response": "ok"}"#.to_string(),
        ]));

        coordinator.execute("first").await;
        coordinator.execute("second").await;

        let turns = coordinator.history().turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "first");
        assert_eq!(turns[1].content, "course answer");
        assert_eq!(turns[3].content, "ok");

        let stats = coordinator.stats();
        assert_eq!(stats.total_exchanges, 2);
        assert_eq!(stats.turns_stored, 4);
        assert_eq!(stats.cached_entries, 0);
        assert_eq!(stats.agent_calls[0].calls, 1);
        assert_eq!(stats.agent_calls[1].calls, 0);
    }

    #[tokio::test]
    async fn test_clear_history_resets_agents() {
        let (mut coordinator, course, instructor) =
            coordinator(MockLlmProvider::single_response(r#"{"agent_to_call": "CourseAgent"}"#));
        coordinator.execute("q").await;

        coordinator.clear_history();

        assert!(coordinator.history().is_empty());
        assert_eq!(coordinator.last_action(), None);
        assert_eq!(course.reset_count(), 1);
        assert_eq!(instructor.reset_count(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let (mut coordinator, _, _) = coordinator(MockLlmProvider::new(vec![]));
        let result =
            coordinator.register_agent("CourseAgent", "again", Arc::new(MockAgent::new("x")));
        assert!(result.is_err());
        assert_eq!(coordinator.agents().len(), 2);
    }
}
