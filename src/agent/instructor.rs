//! Professor ratings from RateMyProfessors
//!
//! Requests go through a [`DialogueManager`] so a professor can be named in one
//! turn and the university in the next. A search returns candidate profile
//! ids; each candidate profile is scraped and kept only if it mentions the
//! university. If the combined name and university search finds nothing, a
//! name-only search is tried once with the same check.

use super::cache::{cache_key, CachedRecord, SourceCache};
use super::dialogue::{DialogueManager, ResolvedRequest, SlotOutcome, DEFAULT_QUESTION};
use super::profile::{self, ProfileFields};
use super::{params, Agent, AgentParameters, LookupError, QUOTA_EXHAUSTED_MESSAGE};
use crate::error::AdvisorResult;
use crate::llm::ClassifierGateway;
use crate::lookup_span;
use crate::scraper::{ScrapeError, ScrapeGateway, ScrapeOptions};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn, Instrument};
use url::Url;

const INSTRUCTOR_PERSONA: &str = "You are a helpful Professor Information Assistant for university students.

Your role is to:
- Provide accurate information about professors based on live RateMyProfessors data
- Help students understand teaching styles, course difficulty, and professor ratings
- Summarize student feedback in a balanced, objective way
- Highlight both strengths and potential concerns
- Be honest about limitations when little data is available
- Mention that the data comes from RateMyProfessors and may not be complete";

/// Profile markdown included in the answer prompt
const MAX_PROFILE_CHARS: usize = 4000;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstructorRecord {
    pub name: String,
    pub university: String,
    pub profile_url: String,
    pub overall_rating: Option<String>,
    pub difficulty: Option<String>,
    pub would_take_again: Option<String>,
    pub num_ratings: u32,
    pub top_tags: Vec<String>,
    pub recent_reviews: Vec<String>,
    pub raw_markdown: String,
}

impl InstructorRecord {
    fn from_profile(name: &str, university: &str, profile_url: &str, markdown: String) -> Self {
        let ProfileFields {
            overall_rating,
            difficulty,
            would_take_again,
            num_ratings,
            top_tags,
            recent_reviews,
        } = profile::parse_profile(&markdown);

        Self {
            name: name.to_string(),
            university: university.to_string(),
            profile_url: profile_url.to_string(),
            overall_rating,
            difficulty,
            would_take_again,
            num_ratings,
            top_tags,
            recent_reviews,
            raw_markdown: markdown,
        }
    }

    /// Prompt context with only the populated fields (pure function)
    pub fn render(&self) -> String {
        let mut out = String::from("PROFESSOR INFORMATION FROM RATEMYPROFESSORS:\n\n");
        if !self.name.is_empty() {
            out.push_str(&format!("Professor Name: {}\n", self.name));
        }
        if !self.university.is_empty() {
            out.push_str(&format!("University: {}\n", self.university));
        }

        let mut ratings = Vec::new();
        if let Some(rating) = &self.overall_rating {
            ratings.push(format!("- Overall Rating: {rating}/5.0"));
        }
        if let Some(difficulty) = &self.difficulty {
            ratings.push(format!("- Difficulty: {difficulty}/5.0"));
        }
        if let Some(again) = &self.would_take_again {
            ratings.push(format!("- Would Take Again: {}", again));
        }
        if self.num_ratings > 0 {
            ratings.push(format!("- Number of Ratings: {}", self.num_ratings));
        }
        if !ratings.is_empty() {
            out.push_str(&format!("\nRATINGS:\n{}\n", ratings.join("\n")));
        }

        if !self.recent_reviews.is_empty() {
            out.push_str("\nRECENT STUDENT REVIEWS:\n");
            for (i, review) in self.recent_reviews.iter().enumerate() {
                out.push_str(&format!("Review {}: {review}\n", i + 1));
            }
        }

        if !self.top_tags.is_empty() {
            out.push_str("\nSTUDENT TAGS:\n");
            for tag in &self.top_tags {
                out.push_str(&format!("  - {tag}\n"));
            }
        }

        if !self.profile_url.is_empty() {
            out.push_str(&format!("\nRateMyProfessors Profile: {}\n", self.profile_url));
        }

        if !self.raw_markdown.trim().is_empty() {
            let excerpt: String = self.raw_markdown.chars().take(MAX_PROFILE_CHARS).collect();
            out.push_str(&format!("\nFULL PROFILE CONTENT:\n{excerpt}\n"));
        }

        out.push_str("\nSource: Live data scraped from RateMyProfessors.com\n");
        out
    }
}

/// Answer prompt for a professor question (pure function)
pub fn build_instructor_prompt(record: &InstructorRecord, question: &str) -> String {
    format!(
        "{INSTRUCTOR_PERSONA}\n\n{}\nUSER QUESTION: {question}\n\n\
         Please provide a helpful, balanced response based on the RateMyProfessors data above. \
         Be specific and cite the information provided.",
        record.render()
    )
}

/// User-facing explanation when no profile could be used (pure function)
pub fn not_found_message(professor: &str, university: &str, error: &LookupError) -> String {
    let who = match (professor.is_empty(), university.is_empty()) {
        (false, false) => format!("Professor {professor} at {university}"),
        (false, true) => format!("Professor {professor}"),
        _ => "that professor".to_string(),
    };

    format!(
        "I couldn't find information about {who} on RateMyProfessors. {error}\n\n\
         This could mean:\n\
         - The professor is not listed on RateMyProfessors or has no ratings yet\n\
         - The name is spelled differently on the site\n\
         - Several professors share this name and none matched the university\n\n\
         Try providing:\n\
         - A different spelling of the name\n\
         - A more specific university name\n\
         - The direct RateMyProfessors profile URL, e.g. https://www.ratemyprofessors.com/professor/12345"
    )
}

#[derive(Debug, Clone)]
pub struct InstructorSearchSettings {
    pub base_url: String,
    pub max_candidates: usize,
}

impl Default for InstructorSearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.ratemyprofessors.com".to_string(),
            max_candidates: 10,
        }
    }
}

pub struct InstructorAgent {
    gateway: ClassifierGateway,
    scraper: Arc<dyn ScrapeGateway>,
    cache: SourceCache,
    settings: InstructorSearchSettings,
    dialogue: Mutex<DialogueManager>,
}

impl InstructorAgent {
    pub fn new(
        gateway: ClassifierGateway,
        scraper: Arc<dyn ScrapeGateway>,
        cache: SourceCache,
        settings: InstructorSearchSettings,
    ) -> Self {
        Self {
            gateway,
            scraper,
            cache,
            settings,
            dialogue: Mutex::new(DialogueManager::new()),
        }
    }

    fn dialogue(&self) -> std::sync::MutexGuard<'_, DialogueManager> {
        self.dialogue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current pending slots, for inspection
    pub fn pending(&self) -> super::dialogue::PendingSlots {
        self.dialogue().pending().clone()
    }

    fn search_url(&self, query: &str) -> Result<String, LookupError> {
        let raw = format!(
            "{}/search/professors",
            self.settings.base_url.trim_end_matches('/')
        );
        let mut url = Url::parse(&raw).map_err(|e| LookupError::Scrape {
            url: raw.clone(),
            source: ScrapeError::InvalidUrl {
                url: raw.clone(),
                reason: e.to_string(),
            },
        })?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url.to_string())
    }

    fn profile_url(&self, id: &str) -> String {
        format!(
            "{}/professor/{id}",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// Cached record or a verified search; only successes are cached
    pub async fn resolve(&self, professor: &str, university: &str) -> Result<InstructorRecord, LookupError> {
        let key = cache_key(university, professor);
        let span = lookup_span!(agent = "instructor", key = %key);

        async {
            if let Some(CachedRecord::Instructor(record)) = self.cache.get(&key) {
                info!("Instructor cache hit");
                return Ok(record);
            }

            let record = self.search_professor(professor, university).await?;
            self.cache.insert(key.clone(), CachedRecord::Instructor(record.clone()));
            Ok(record)
        }
        .instrument(span)
        .await
    }

    async fn search_professor(
        &self,
        professor: &str,
        university: &str,
    ) -> Result<InstructorRecord, LookupError> {
        let query = format!("{professor} {university}");
        let candidates = self.candidate_ids(&query).await?;
        if candidates.is_empty() {
            return Err(LookupError::NotFound {
                subject: format!("{professor} (no profiles in search results)"),
            });
        }

        if let Some(record) = self.first_matching(&candidates, professor, university).await {
            return Ok(record);
        }

        debug!("No candidate matched the university, retrying with name only");
        let fallback = self.candidate_ids(professor).await.unwrap_or_else(|e| {
            warn!(error = %e, "Name-only search failed");
            Vec::new()
        });
        let checked = &candidates[..candidates.len().min(self.settings.max_candidates)];
        let unchecked: Vec<String> = fallback
            .into_iter()
            .filter(|id| !checked.contains(id))
            .collect();
        if let Some(record) = self.first_matching(&unchecked, professor, university).await {
            return Ok(record);
        }

        Err(LookupError::NotFound {
            subject: format!("{professor} at {university}"),
        })
    }

    async fn candidate_ids(&self, query: &str) -> Result<Vec<String>, LookupError> {
        let url = self.search_url(query)?;
        let page = self
            .scraper
            .scrape(&url, &ScrapeOptions::full_page())
            .await
            .map_err(|source| LookupError::Scrape {
                url: url.clone(),
                source,
            })?;

        let text = format!("{}\n{}", page.markdown, page.html.unwrap_or_default());
        let ids = profile::profile_ids(&text);
        debug!(query, candidates = ids.len(), "Search results");
        Ok(ids)
    }

    async fn first_matching(
        &self,
        ids: &[String],
        professor: &str,
        university: &str,
    ) -> Option<InstructorRecord> {
        for id in ids.iter().take(self.settings.max_candidates) {
            let url = self.profile_url(id);
            match self.scraper.scrape(&url, &ScrapeOptions::markdown_only()).await {
                Ok(page) if profile::university_matches(&page.markdown, university) => {
                    info!(profile = %url, "Matched professor profile");
                    return Some(InstructorRecord::from_profile(
                        professor,
                        university,
                        &url,
                        page.markdown,
                    ));
                }
                Ok(_) => debug!(profile = %url, "Profile does not mention the university"),
                Err(e) => warn!(profile = %url, error = %e, "Profile scrape failed"),
            }
        }
        None
    }

    /// Scrape a profile the user pointed at directly
    pub async fn resolve_profile_url(
        &self,
        url: &str,
        professor: &str,
        university: &str,
    ) -> Result<InstructorRecord, LookupError> {
        if !profile::is_profile_url(url) {
            return Err(LookupError::InvalidProfileUrl {
                url: url.to_string(),
            });
        }

        let page = self
            .scraper
            .scrape(url, &ScrapeOptions::markdown_only())
            .await
            .map_err(|source| LookupError::Scrape {
                url: url.to_string(),
                source,
            })?;

        Ok(InstructorRecord::from_profile(
            professor,
            university,
            url,
            page.markdown,
        ))
    }

    async fn answer(&self, record: &InstructorRecord, question: &str) -> AdvisorResult<String> {
        match self
            .gateway
            .answer(&build_instructor_prompt(record, question))
            .await
        {
            Ok(answer) => Ok(answer),
            Err(e) if e.is_quota_exhausted() => Ok(QUOTA_EXHAUSTED_MESSAGE.to_string()),
            Err(e) => Err(e.into()),
        }
    }

    async fn dispatch(&self, request: ResolvedRequest) -> AdvisorResult<String> {
        info!(professor = %request.subject, university = %request.qualifier, "Looking up professor");
        match self.resolve(&request.subject, &request.qualifier).await {
            Ok(record) => self.answer(&record, &request.question).await,
            Err(e) => Ok(not_found_message(&request.subject, &request.qualifier, &e)),
        }
    }
}

#[async_trait]
impl Agent for InstructorAgent {
    async fn handle(&self, parameters: &AgentParameters) -> AdvisorResult<String> {
        let professor = parameters.get(params::PROFESSOR_NAME);
        let university = parameters.get(params::UNIVERSITY);
        let question = parameters.get(params::QUESTION);

        if let Some(url) = parameters.get(params::PROFILE_URL) {
            // A direct profile settles any pending request
            let pending = {
                let mut dialogue = self.dialogue();
                let pending = dialogue.pending().clone();
                dialogue.reset();
                pending
            };
            let professor = professor.map(str::to_string).or(pending.subject).unwrap_or_default();
            let university = university.map(str::to_string).or(pending.qualifier).unwrap_or_default();
            let question = question
                .map(str::to_string)
                .or(pending.question)
                .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

            return match self.resolve_profile_url(url, &professor, &university).await {
                Ok(record) => self.answer(&record, &question).await,
                Err(e) => Ok(not_found_message(&professor, &university, &e)),
            };
        }

        let outcome = self.dialogue().advance(professor, university, question);
        match outcome {
            SlotOutcome::Dispatch(request) => self.dispatch(request).await,
            other => Ok(other.clarification().unwrap_or_default()),
        }
    }

    fn reset(&self) {
        self.dialogue().reset();
    }
}
