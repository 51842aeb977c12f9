//! Ordered registry of callable agents

use super::Agent;
use crate::error::{AdvisorError, AdvisorResult};
use std::sync::Arc;
use tracing::info;

pub struct AgentRegistration {
    pub name: String,
    pub description: String,
    pub handler: Arc<dyn Agent>,
    pub invocation_count: u64,
}

impl std::fmt::Debug for AgentRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistration")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("invocation_count", &self.invocation_count)
            .finish()
    }
}

/// Registration order is preserved so the classifier prompt is stable.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentRegistration>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; names are unique
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn Agent>,
    ) -> AdvisorResult<()> {
        let name = name.into();
        if name.trim().is_empty() || name.eq_ignore_ascii_case("none") {
            return Err(AdvisorError::invalid_input(format!(
                "'{name}' cannot be used as an agent name"
            )));
        }
        if self.get(&name).is_some() {
            return Err(AdvisorError::duplicate_agent(name));
        }

        info!(agent = %name, "Registered agent");
        self.agents.push(AgentRegistration {
            name,
            description: description.into(),
            handler,
            invocation_count: 0,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AgentRegistration> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Count one dispatch and hand back the handler
    pub fn record_invocation(&mut self, name: &str) -> Option<Arc<dyn Agent>> {
        let registration = self.agents.iter_mut().find(|a| a.name == name)?;
        registration.invocation_count += 1;
        Some(Arc::clone(&registration.handler))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRegistration> {
        self.agents.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Reset every agent's conversation state
    pub fn reset_all(&self) {
        for agent in &self.agents {
            agent.handler.reset();
        }
    }
}
