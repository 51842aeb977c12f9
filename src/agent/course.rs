//! Course catalogue lookups

use super::cache::{cache_key, CachedRecord, SourceCache};
use super::catalog::{CourseCode, University, UniversityCatalog};
use super::{params, Agent, AgentParameters, LookupError, QUOTA_EXHAUSTED_MESSAGE};
use crate::error::AdvisorResult;
use crate::llm::ClassifierGateway;
use crate::lookup_span;
use crate::scraper::{ScrapeGateway, ScrapeOptions, ScrapedPage};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

const COURSE_PERSONA: &str = "You are a knowledgeable Course Information Assistant that helps university students.

Your role:
- Provide accurate information about courses based on the catalogue data below
- Answer questions clearly and concisely
- Help students understand course requirements, content, and prerequisites
- Say so when information is incomplete

Guidelines:
- Use a friendly, supportive tone and bullet points where they help
- Only use what is in the catalogue data; never invent details
- Mention that the information comes from the official course catalogue and cite the source URL";

const DEFAULT_COURSE_QUESTION: &str = "Give me an overview of this course.";

static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid title regex"));
static CREDITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+\.?\d*)\s*(?:credits?|units?)").expect("valid credits regex"));
static DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n(.{100,}?)\n\n").expect("valid description regex"));

/// Structured view of one catalogue page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseRecord {
    pub code: String,
    pub university: String,
    pub source_url: String,
    pub title: Option<String>,
    pub credits: Option<String>,
    pub description: Option<String>,
    pub prerequisites: Option<String>,
    pub corequisites: Option<String>,
    pub markdown_content: String,
}

impl CourseRecord {
    /// Extract what can be found in the page markdown (pure function)
    pub fn from_page(code: &CourseCode, university: &University, page: &ScrapedPage) -> Self {
        let markdown = page.markdown.as_str();

        Self {
            code: code.to_string(),
            university: university.name.clone(),
            source_url: page.url.clone(),
            title: TITLE.captures(markdown).map(|c| c[1].trim().to_string()),
            credits: CREDITS.captures(markdown).map(|c| c[1].to_string()),
            description: DESCRIPTION
                .captures(markdown)
                .map(|c| c[1].trim().to_string()),
            prerequisites: labelled_section(markdown, "prerequisite", &["\n\n", "\n#", "corequisite"]),
            corequisites: labelled_section(markdown, "corequisite", &["\n\n", "\n#"]),
            markdown_content: page.markdown.clone(),
        }
    }

    /// Prompt context with only the populated fields (pure function)
    pub fn render(&self) -> String {
        let mut out = String::from("COURSE CATALOGUE INFORMATION:\n\n");
        out.push_str(&format!("Course Code: {}\n", self.code));
        if !self.university.is_empty() {
            out.push_str(&format!("University: {}\n", self.university));
        }
        out.push_str(&format!("Source URL: {}\n\n", self.source_url));

        let fields = [
            ("Title", &self.title),
            ("Credits", &self.credits),
            ("Description", &self.description),
            ("Prerequisites", &self.prerequisites),
            ("Corequisites", &self.corequisites),
        ];
        for (label, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                out.push_str(&format!("{label}: {value}\n\n"));
            }
        }

        if !self.markdown_content.trim().is_empty() {
            out.push_str("Full Course Page Content:\n");
            out.push_str(&self.markdown_content);
            out.push('\n');
        }
        out
    }
}

/// Text following `label` (plus optional "s" and ":") up to the first stop marker.
/// Matching is ASCII case-insensitive and the section holds at least one character.
fn labelled_section(markdown: &str, label: &str, stops: &[&str]) -> Option<String> {
    let lower = markdown.to_ascii_lowercase();
    let mut pos = lower.find(label)? + label.len();

    for optional in ["s", ":"] {
        if lower[pos..].starts_with(optional) {
            pos += 1;
        }
    }
    pos += lower[pos..].len() - lower[pos..].trim_start().len();

    let rest = &markdown[pos..];
    let first = rest.chars().next()?.len_utf8();
    let end = stops
        .iter()
        .filter_map(|stop| lower[pos + first..].find(stop).map(|i| i + first))
        .min()
        .unwrap_or(rest.len());

    let text = rest[..end].trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Answer prompt for a course question (pure function)
pub fn build_course_prompt(record: &CourseRecord, question: &str) -> String {
    format!(
        "{COURSE_PERSONA}\n\n{}\nUser Question: {question}\n\
         Provide a helpful, accurate response based on the course information above.",
        record.render()
    )
}

/// Looks courses up in university catalogues and answers questions about them
pub struct CourseAgent {
    gateway: ClassifierGateway,
    scraper: Arc<dyn ScrapeGateway>,
    cache: SourceCache,
    catalog: UniversityCatalog,
}

impl CourseAgent {
    pub fn new(
        gateway: ClassifierGateway,
        scraper: Arc<dyn ScrapeGateway>,
        cache: SourceCache,
        catalog: UniversityCatalog,
    ) -> Self {
        Self {
            gateway,
            scraper,
            cache,
            catalog,
        }
    }

    pub fn catalog(&self) -> &UniversityCatalog {
        &self.catalog
    }

    /// Cached record or a fresh scrape; only successes are cached
    pub async fn resolve(
        &self,
        university: Option<&str>,
        course_code: &str,
    ) -> Result<CourseRecord, LookupError> {
        let university = self.catalog.resolve(university)?;
        let code = CourseCode::parse(course_code)?;
        let key = cache_key(&university.key, &code.to_string());

        let span = lookup_span!(agent = "course", key = %key);
        async {
            if let Some(CachedRecord::Course(record)) = self.cache.get(&key) {
                info!("Course cache hit");
                return Ok(record);
            }

            let url = university.course_url(&code);
            debug!(url = %url, scraper = self.scraper.name(), "Course cache miss, scraping");

            let page = self
                .scraper
                .scrape(&url, &ScrapeOptions::main_content())
                .await
                .map_err(|source| LookupError::Scrape {
                    url: url.clone(),
                    source,
                })?;

            let record = CourseRecord::from_page(&code, university, &page);
            self.cache.insert(key.clone(), CachedRecord::Course(record.clone()));
            Ok(record)
        }
        .instrument(span)
        .await
    }

    fn missing_code_message(&self) -> String {
        let examples = self
            .catalog
            .universities()
            .iter()
            .map(|u| format!("\"{}\" ({})", u.example, u.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Which course would you like to know about? Please include the course code.\n\n\
             For example: {examples}"
        )
    }
}

#[async_trait]
impl Agent for CourseAgent {
    async fn handle(&self, parameters: &AgentParameters) -> AdvisorResult<String> {
        let question = parameters
            .get(params::QUESTION)
            .unwrap_or(DEFAULT_COURSE_QUESTION);

        let course_code = match parameters.get(params::COURSE_CODE) {
            Some(code) => code.to_string(),
            None => match CourseCode::find_in_text(question) {
                Some(code) => code.to_string(),
                None => return Ok(self.missing_code_message()),
            },
        };

        let record = match self
            .resolve(parameters.get(params::UNIVERSITY), &course_code)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                info!(error = %e, "Course lookup failed");
                return Ok(format!(
                    "Error: {e}\n\nPlease check the university key and course code."
                ));
            }
        };

        match self.gateway.answer(&build_course_prompt(&record, question)).await {
            Ok(answer) => Ok(answer),
            Err(e) if e.is_quota_exhausted() => Ok(QUOTA_EXHAUSTED_MESSAGE.to_string()),
            Err(e) => Err(e.into()),
        }
    }
}
