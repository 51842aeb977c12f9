//! Wiring of configuration, gateways and agents into a [`Coordinator`]
//!
//! Provider and scraper construction stays in the binary; everything here
//! takes them as injected trait objects so tests can assemble the same
//! coordinator from mocks.

use crate::agent::{
    CourseAgent, InstructorAgent, InstructorSearchSettings, SourceCache, UniversityCatalog,
};
use crate::config::AdvisorConfig;
use crate::error::AdvisorResult;
use crate::llm::{ClassifierGateway, GatewaySettings, LlmProvider, RateLimiter};
use crate::routing::{Coordinator, CoordinatorSettings};
use crate::scraper::ScrapeGateway;
use std::sync::Arc;
use tracing::info;

pub const COURSE_AGENT: &str = "CourseAgent";
pub const INSTRUCTOR_AGENT: &str = "InstructorAgent";

const COURSE_AGENT_DESCRIPTION: &str =
    "Answers course questions, prerequisites, difficulty, and summaries using live catalogue data.";
const INSTRUCTOR_AGENT_DESCRIPTION: &str =
    "Provides live information about professors from RateMyProfessors (ratings, difficulty, reviews).";

/// Injected collaborators
pub struct AdvisorServices {
    pub provider: Arc<dyn LlmProvider>,
    pub scraper: Arc<dyn ScrapeGateway>,
    /// Register the instructor agent (needs a scraper that can render search pages)
    pub instructor_enabled: bool,
}

pub fn gateway_settings(config: &AdvisorConfig) -> GatewaySettings {
    GatewaySettings {
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
        timeout: config.llm_timeout(),
    }
}

/// Build a coordinator with its agents registered
pub fn build_coordinator(
    config: &AdvisorConfig,
    services: AdvisorServices,
) -> AdvisorResult<Coordinator> {
    let limiter = Arc::new(RateLimiter::new(config.min_request_interval()));
    let gateway = ClassifierGateway::new(services.provider, limiter, gateway_settings(config));
    let cache = SourceCache::new();

    let catalog = UniversityCatalog::builtin(&config.courses.default_university);
    let default_university = catalog.resolve(None)?.name.clone();

    let settings = CoordinatorSettings {
        default_agent: config.coordinator.default_agent.clone(),
        history_window: config.coordinator.history_window,
        default_university,
    };
    let mut coordinator = Coordinator::new(gateway.clone(), cache.clone(), settings);

    let course_agent = CourseAgent::new(
        gateway.clone(),
        Arc::clone(&services.scraper),
        cache.clone(),
        catalog,
    );
    coordinator.register_agent(COURSE_AGENT, COURSE_AGENT_DESCRIPTION, Arc::new(course_agent))?;

    if services.instructor_enabled {
        let instructor_agent = InstructorAgent::new(
            gateway,
            services.scraper,
            cache,
            InstructorSearchSettings {
                base_url: config.instructors.base_url.clone(),
                max_candidates: config.instructors.max_candidates,
            },
        );
        coordinator.register_agent(
            INSTRUCTOR_AGENT,
            INSTRUCTOR_AGENT_DESCRIPTION,
            Arc::new(instructor_agent),
        )?;
    } else {
        info!("Instructor agent disabled (no scraper API key)");
    }

    Ok(coordinator)
}
