//! Mock implementations for testing
//!
//! Provides mock LlmProvider, ScrapeGateway and Agent implementations so the
//! coordinator and agents can be tested without network access or API keys.

use crate::agent::{Agent, AgentParameters};
use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::scraper::{ScrapeError, ScrapeGateway, ScrapeOptions, ScrapedPage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Mock LLM provider for testing
///
/// Scripted results are returned in order and cycle when exhausted. Every
/// request and the (tokio) instant it arrived are recorded.
#[derive(Debug)]
pub struct MockLlmProvider {
    pub results: Vec<Result<String, LlmError>>,
    pub current_response: Arc<Mutex<usize>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub call_instants: Arc<Mutex<Vec<Instant>>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(results: Vec<Result<String, LlmError>>) -> Self {
        Self {
            results,
            current_response: Arc::new(Mutex::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_instants: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Every call fails with `error`
    pub fn with_error(error: LlmError) -> Self {
        Self::from_results(vec![Err(error)])
    }

    pub fn with_failure() -> Self {
        Self::with_error(LlmError::RequestFailed("Mock LLM failure".to_string()))
    }

    pub async fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn get_call_instants(&self) -> Vec<Instant> {
        self.call_instants.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.call_instants.lock().await.push(Instant::now());
        self.requests.lock().await.push(request);

        let mut current = self.current_response.lock().await;
        let response_idx = *current % self.results.len().max(1);
        *current += 1;

        let content = match self.results.get(response_idx) {
            Some(Ok(text)) => text.clone(),
            Some(Err(e)) => return Err(e.clone()),
            None => "Mock response".to_string(),
        };

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
            metadata: HashMap::new(),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Mock scraper for testing
///
/// Pages are matched by exact URL first, then by the longest registered
/// prefix. Unknown URLs fail with HTTP 404.
#[derive(Debug, Default)]
pub struct MockScrapeGateway {
    pages: HashMap<String, Result<ScrapedPage, ScrapeError>>,
    prefixes: Vec<(String, Result<ScrapedPage, ScrapeError>)>,
    pub requests: Arc<Mutex<Vec<(String, ScrapeOptions)>>>,
}

impl MockScrapeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, markdown: impl Into<String>) -> Self {
        self.with_html_page(url, markdown, None)
    }

    pub fn with_html_page(
        mut self,
        url: impl Into<String>,
        markdown: impl Into<String>,
        html: Option<String>,
    ) -> Self {
        let url = url.into();
        let page = ScrapedPage {
            url: url.clone(),
            markdown: markdown.into(),
            html,
        };
        self.pages.insert(url, Ok(page));
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, error: ScrapeError) -> Self {
        self.pages.insert(url.into(), Err(error));
        self
    }

    /// Serve `markdown` for every URL starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>, markdown: impl Into<String>) -> Self {
        let page = ScrapedPage {
            url: String::new(),
            markdown: markdown.into(),
            html: None,
        };
        self.prefixes.push((prefix.into(), Ok(page)));
        self
    }

    pub async fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub async fn get_requests(&self) -> Vec<(String, ScrapeOptions)> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    fn lookup(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        if let Some(result) = self.pages.get(url) {
            return result.clone();
        }

        let prefixed = self
            .prefixes
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());

        match prefixed {
            Some((_, Ok(page))) => Ok(ScrapedPage {
                url: url.to_string(),
                ..page.clone()
            }),
            Some((_, Err(e))) => Err(e.clone()),
            None => Err(ScrapeError::Http {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ScrapeGateway for MockScrapeGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapedPage, ScrapeError> {
        self.requests
            .lock()
            .await
            .push((url.to_string(), options.clone()));
        self.lookup(url)
    }
}

/// Mock agent for testing
///
/// Replies with a fixed text, records every parameter set it receives and
/// counts resets.
#[derive(Debug, Default)]
pub struct MockAgent {
    pub reply: String,
    pub received: Arc<Mutex<Vec<AgentParameters>>>,
    pub failure: Arc<Mutex<Option<String>>>,
    resets: AtomicUsize,
}

impl MockAgent {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Default::default()
        }
    }

    /// Make later calls fail with an internal error
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().await = Some(message.into());
    }

    pub async fn calls(&self) -> Vec<AgentParameters> {
        self.received.lock().await.clone()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for MockAgent {
    async fn handle(&self, parameters: &AgentParameters) -> AdvisorResult<String> {
        self.received.lock().await.push(parameters.clone());

        match self.failure.lock().await.as_ref() {
            Some(message) => Err(AdvisorError::internal_error(message.clone())),
            None => Ok(self.reply.clone()),
        }
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_cycles_results() {
        let provider = MockLlmProvider::from_results(vec![
            Ok("first".to_string()),
            Err(LlmError::Timeout(5)),
        ]);
        let request = CompletionRequest {
            messages: vec![],
            model: "mock-model".to_string(),
            max_tokens: None,
            temperature: None,
            response_format: None,
            metadata: HashMap::new(),
        };

        assert_eq!(
            provider.complete(request.clone()).await.unwrap().content.as_deref(),
            Some("first")
        );
        assert!(matches!(
            provider.complete(request.clone()).await,
            Err(LlmError::Timeout(5))
        ));
        assert!(provider.complete(request).await.is_ok());
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_mock_scraper_matching() {
        let scraper = MockScrapeGateway::new()
            .with_page("https://a.test/x", "exact")
            .with_prefix("https://a.test/", "short")
            .with_prefix("https://a.test/professor/", "long")
            .with_failure("https://a.test/down", ScrapeError::Network("reset".to_string()));
        let options = ScrapeOptions::default();

        assert_eq!(scraper.scrape("https://a.test/x", &options).await.unwrap().markdown, "exact");
        assert_eq!(
            scraper.scrape("https://a.test/professor/1", &options).await.unwrap().markdown,
            "long"
        );
        assert!(scraper.scrape("https://a.test/down", &options).await.is_err());
        assert!(matches!(
            scraper.scrape("https://b.test/", &options).await,
            Err(ScrapeError::Http { status: 404, .. })
        ));
        assert_eq!(scraper.call_count().await, 4);
    }
}
