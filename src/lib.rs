//! Course Advisor
//!
//! A conversational assistant that answers university course and professor
//! questions from live web sources.
//!
//! # Overview
//!
//! - [`routing::Coordinator`] classifies each query with an LLM and dispatches it
//! - [`agent::CourseAgent`] scrapes course catalogues
//! - [`agent::InstructorAgent`] looks professors up on RateMyProfessors, asking
//!   follow-up questions until it knows both the name and the university
//! - [`llm::ClassifierGateway`] spaces every LLM call with a shared [`llm::RateLimiter`]
//! - [`scraper::ScrapeGateway`] abstracts the page source (Firecrawl or direct HTTP)
//!
//! # Quick Start
//!
//! ```rust
//! use course_advisor::routing::decode_decision;
//!
//! let outcome = decode_decision("not json", "What is CMPUT 174?", "CourseAgent");
//! assert!(outcome.is_fallback());
//! assert_eq!(outcome.decision().agent_to_call, "CourseAgent");
//! ```

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod routing;
pub mod scraper;
pub mod testing;

pub use app::{build_coordinator, AdvisorServices};
pub use config::AdvisorConfig;
pub use error::{AdvisorError, AdvisorResult};
pub use routing::{Coordinator, RoutingDecision};
