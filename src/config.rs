//! Advisor configuration
//!
//! Every field has a default, so the advisor runs without any file as long as
//! the LLM key is in the environment. Secrets are never stored in the file;
//! the file only names the environment variables that hold them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Files probed, in order, when no `--config` path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["advisor.toml", "config/advisor.toml"];

/// Providers the LLM factory knows how to build
pub const SUPPORTED_PROVIDERS: [&str; 2] = ["gemini", "openai"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub scraper: ScraperSection,
    #[serde(default)]
    pub coordinator: CoordinatorSection,
    #[serde(default)]
    pub courses: CoursesSection,
    #[serde(default)]
    pub instructors: InstructorsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// "gemini" or "openai"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable containing the API key
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    /// Override the provider endpoint (proxies, tests)
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Cooldown between two LLM calls
    #[serde(default = "default_min_interval")]
    pub min_request_interval_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_llm_key_env(),
            base_url: None,
            temperature: Some(0.2),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
            min_request_interval_secs: default_min_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScraperSection {
    /// Environment variable containing the Firecrawl key; optional
    #[serde(default = "default_scraper_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_scraper_base_url")]
    pub base_url: String,
    #[serde(default = "default_scraper_timeout")]
    pub timeout_secs: u64,
}

impl Default for ScraperSection {
    fn default() -> Self {
        Self {
            api_key_env: default_scraper_key_env(),
            base_url: default_scraper_base_url(),
            timeout_secs: default_scraper_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinatorSection {
    /// Agent used when a classification cannot be decoded
    #[serde(default = "default_agent")]
    pub default_agent: String,
    /// Number of most recent turns shown to the classifier
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            history_window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoursesSection {
    /// Catalogue key used when a course question names no university
    #[serde(default = "default_university")]
    pub default_university: String,
}

impl Default for CoursesSection {
    fn default() -> Self {
        Self {
            default_university: default_university(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstructorsSection {
    #[serde(default = "default_ratings_base_url")]
    pub base_url: String,
    /// Profiles checked per search before giving up
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for InstructorsSection {
    fn default() -> Self {
        Self {
            base_url: default_ratings_base_url(),
            max_candidates: default_max_candidates(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_llm_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_min_interval() -> u64 {
    12
}

fn default_scraper_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}

fn default_scraper_base_url() -> String {
    "https://api.firecrawl.dev".to_string()
}

fn default_scraper_timeout() -> u64 {
    60
}

fn default_agent() -> String {
    "CourseAgent".to_string()
}

fn default_history_window() -> usize {
    6
}

fn default_university() -> String {
    "ualberta".to_string()
}

fn default_ratings_base_url() -> String {
    "https://www.ratemyprofessors.com".to_string()
}

fn default_max_candidates() -> usize {
    10
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to render TOML: {0}")]
    TomlRender(#[from] toml::ser::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AdvisorConfig {
    /// Load and validate a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AdvisorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path if given, else the first default path that exists, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load_from_file(path)?, Some(path.to_path_buf())));
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.is_file() {
                return Ok((Self::load_from_file(path)?, Some(path.to_path_buf())));
            }
        }

        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Unsupported LLM provider '{}', expected one of: {}",
                self.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature {temperature} outside 0.0..=2.0"
                )));
            }
        }
        if self.llm.timeout_secs == 0 || self.scraper.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.coordinator.history_window < 2 {
            return Err(ConfigError::InvalidConfig(
                "coordinator.history_window must cover at least one exchange (2 turns)"
                    .to_string(),
            ));
        }
        if self.coordinator.default_agent.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "coordinator.default_agent must not be empty".to_string(),
            ));
        }
        if self.instructors.max_candidates == 0 {
            return Err(ConfigError::InvalidConfig(
                "instructors.max_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// LLM API key from the configured environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        Self::get_env_var_required(&self.llm.api_key_env)
    }

    /// Scraper API key, `None` when unset or blank
    pub fn get_scraper_api_key(&self) -> Option<String> {
        Self::get_env_var_required(&self.scraper.api_key_env).ok()
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn scraper_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(self.llm.min_request_interval_secs)
    }
}
