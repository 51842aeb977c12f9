//! Scraper gateway abstraction
//!
//! A scraper turns a URL into page text. The agents only depend on
//! [`ScrapeGateway`]; the Firecrawl API and a plain HTTP fetcher are the two
//! implementations. An error-flagged API response and a transport fault are
//! both reported as `Err(ScrapeError)`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod direct;
pub mod firecrawl;

pub use direct::DirectFetchGateway;
pub use firecrawl::{FirecrawlClient, FirecrawlConfig};

/// Content formats a scrape may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
    Html,
}

/// Per-request scrape flags
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOptions {
    pub formats: Vec<ContentFormat>,
    pub only_main_content: bool,
}

impl ScrapeOptions {
    /// Markdown and HTML of the main article only
    pub fn main_content() -> Self {
        Self {
            formats: vec![ContentFormat::Markdown, ContentFormat::Html],
            only_main_content: true,
        }
    }

    /// Markdown and HTML of the whole page, navigation included (search result pages)
    pub fn full_page() -> Self {
        Self {
            formats: vec![ContentFormat::Markdown, ContentFormat::Html],
            only_main_content: false,
        }
    }

    pub fn markdown_only() -> Self {
        Self {
            formats: vec![ContentFormat::Markdown],
            only_main_content: true,
        }
    }

    pub fn wants_html(&self) -> bool {
        self.formats.contains(&ContentFormat::Html)
    }
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self::main_content()
    }
}

/// Content of one scraped page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub markdown: String,
    pub html: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScrapeError {
    #[error("Scraper not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
    #[error("Scraper rejected {url}: {reason}")]
    Rejected { url: String, reason: String },
    #[error("Invalid scraper response: {0}")]
    InvalidResponse(String),
    #[error("No content returned for {0}")]
    Empty(String),
}

impl ScrapeError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Network(_) => true,
            ScrapeError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// URL in, page content out
#[async_trait]
pub trait ScrapeGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapedPage, ScrapeError>;
}
