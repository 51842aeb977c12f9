//! Configuration loading and validation tests
//!
//! Tests focus on the observable outcome of loading a file: which values end
//! up in the config, and which files are refused.

use course_advisor::config::{AdvisorConfig, ConfigError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_test::assert_ok;

fn write_config(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{contents}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
temperature = 0.1
min_request_interval_secs = 4

[scraper]
api_key_env = "MY_FIRECRAWL_KEY"
timeout_secs = 30

[coordinator]
default_agent = "CourseAgent"
history_window = 8

[courses]
default_university = "stanford"

[instructors]
max_candidates = 3
"#,
    );

    let config = assert_ok!(AdvisorConfig::load_from_file(temp_file.path()));

    assert_eq!(config.llm.provider, "openai");
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.temperature, Some(0.1));
    assert_eq!(config.min_request_interval(), Duration::from_secs(4));
    assert_eq!(config.scraper.api_key_env, "MY_FIRECRAWL_KEY");
    assert_eq!(config.scraper_timeout(), Duration::from_secs(30));
    assert_eq!(config.coordinator.history_window, 8);
    assert_eq!(config.courses.default_university, "stanford");
    assert_eq!(config.instructors.max_candidates, 3);
}

#[test]
fn test_missing_sections_use_defaults() {
    let temp_file = write_config("[llm]\nmodel = \"gemini-2.0-flash\"\n");

    let config = AdvisorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.llm.model, "gemini-2.0-flash");
    assert_eq!(config.llm.provider, "gemini");
    assert_eq!(config.min_request_interval(), Duration::from_secs(12));
    assert_eq!(config.coordinator.default_agent, "CourseAgent");
    assert_eq!(config.instructors.base_url, "https://www.ratemyprofessors.com");
}

#[test]
fn test_config_fails_with_malformed_toml() {
    let temp_file = write_config("[llm\nprovider = gemini");

    let result = AdvisorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_config_fails_when_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let result = AdvisorConfig::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_config_rejects_invalid_values() {
    for contents in [
        "[llm]\nprovider = \"anthropic\"\n",
        "[llm]\nmodel = \"  \"\n",
        "[llm]\ntemperature = 3.5\n",
        "[llm]\ntimeout_secs = 0\n",
        "[coordinator]\nhistory_window = 0\n",
        "[coordinator]\ndefault_agent = \"\"\n",
        "[instructors]\nmax_candidates = 0\n",
    ] {
        let temp_file = write_config(contents);
        let result = AdvisorConfig::load_from_file(temp_file.path());
        assert!(
            matches!(result, Err(ConfigError::InvalidConfig(_))),
            "expected rejection of {contents:?}"
        );
    }
}

#[test]
fn test_discover_prefers_explicit_path() {
    let temp_file = write_config("[coordinator]\nhistory_window = 4\n");

    let (config, path) = AdvisorConfig::discover(Some(temp_file.path())).unwrap();

    assert_eq!(config.coordinator.history_window, 4);
    assert_eq!(path.as_deref(), Some(temp_file.path()));
}

#[test]
fn test_discover_explicit_missing_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("advisor.toml");

    assert!(AdvisorConfig::discover(Some(&missing)).is_err());
}

#[test]
fn test_rendered_config_loads_back() {
    let mut config = AdvisorConfig::default();
    config.llm.base_url = Some("http://localhost:8080/v1beta".to_string());
    config.instructors.max_candidates = 5;

    let temp_file = write_config(&config.to_toml_string().unwrap());
    let loaded = AdvisorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(loaded, config);
}
