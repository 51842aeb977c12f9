//! Lookup agents
//!
//! An agent takes the parameters extracted by the routing classifier and
//! returns answer text. Agents never fail a turn for expected problems
//! (unknown university, nothing found, quota); those become user-facing
//! text. `Err` is reserved for faults the coordinator reports as such.

pub mod cache;
pub mod catalog;
pub mod course;
pub mod dialogue;
pub mod instructor;
pub mod profile;
pub mod registry;

pub use cache::{cache_key, CachedRecord, SourceCache};
pub use catalog::{CourseCode, University, UniversityCatalog, UrlPattern};
pub use course::{CourseAgent, CourseRecord};
pub use dialogue::{DialogueManager, DialoguePhase, PendingSlots, ResolvedRequest, SlotOutcome};
pub use instructor::{InstructorAgent, InstructorRecord, InstructorSearchSettings};
pub use registry::{AgentRegistration, AgentRegistry};

use crate::error::AdvisorResult;
use crate::scraper::ScrapeError;
use async_trait::async_trait;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Parameter names shared by the classifier prompt and the agents
pub mod params {
    pub const COURSE_CODE: &str = "course_code";
    pub const UNIVERSITY: &str = "university";
    pub const PROFESSOR_NAME: &str = "professor_name";
    pub const QUESTION: &str = "question";
    pub const PROFILE_URL: &str = "profile_url";
}

/// Message shown instead of a raw quota error
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "⚠️ Rate limit exceeded. Wait 1 minute and try again.";

#[async_trait]
pub trait Agent: Send + Sync {
    /// Answer one request
    async fn handle(&self, parameters: &AgentParameters) -> AdvisorResult<String>;

    /// Drop any per-conversation state
    fn reset(&self) {}
}

/// Values the classifier uses instead of null
const PLACEHOLDER_VALUES: [&str; 5] = ["", "null", "none", "unknown", "n/a"];

/// Named string parameters of a routing decision.
///
/// Decoding repairs model output: numbers and booleans are stringified,
/// arrays of strings are joined, and placeholder strings become `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, Value>")]
pub struct AgentParameters(HashMap<String, Option<String>>);

impl AgentParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a present value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    /// Insert, applying the same placeholder repair as decoding
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value.and_then(|v| repair_text(&v)));
    }

    /// Present, non-empty value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries sorted by key, for stable logging
    pub fn sorted(&self) -> Vec<(&str, Option<&str>)> {
        let mut entries: Vec<_> = self
            .0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

fn repair_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if PLACEHOLDER_VALUES
        .iter()
        .any(|p| trimmed.eq_ignore_ascii_case(p))
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn repair_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => repair_text(&s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(repair_value).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

impl From<HashMap<String, Value>> for AgentParameters {
    fn from(raw: HashMap<String, Value>) -> Self {
        Self(
            raw.into_iter()
                .map(|(k, v)| (k, repair_value(v)))
                .collect(),
        )
    }
}

impl Serialize for AgentParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl JsonSchema for AgentParameters {
    fn schema_name() -> String {
        "AgentParameters".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <HashMap<String, Option<String>>>::json_schema(gen)
    }
}

/// Why a lookup produced no record
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("Unknown university '{key}'. Available universities: {}", available.join(", "))]
    UnknownUniversity { key: String, available: Vec<String> },

    #[error("Invalid course code format: '{code}'. Use a subject and number such as 'CMPUT 174'")]
    InvalidCourseCode { code: String },

    #[error("Failed to fetch {url}: {source}")]
    Scrape { url: String, source: ScrapeError },

    #[error("No record found for '{subject}'")]
    NotFound { subject: String },

    #[error("Invalid RateMyProfessors URL: '{url}'. Expected a link containing ratemyprofessors.com/professor/")]
    InvalidProfileUrl { url: String },
}
