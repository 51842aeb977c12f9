//! Keyless scraper: plain GET plus readability extraction
//!
//! Used for course catalogue pages when no Firecrawl key is configured.
//! Output is plain text rather than real markdown, which the course parser
//! tolerates since it only looks for headings and labelled lines.

use super::{ScrapeError, ScrapeGateway, ScrapeOptions, ScrapedPage};
use article_scraper::Readability;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub struct DirectFetchGateway {
    client: Client,
    max_response_size: usize,
}

impl DirectFetchGateway {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("course-advisor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        Ok(Self {
            client,
            max_response_size: 2 * 1024 * 1024,
        })
    }

    /// Readability extraction, falling back to tag stripping.
    /// article_scraper can panic on malformed markup so it runs behind catch_unwind.
    async fn extract_readable_content(html: &str, url: Url) -> String {
        let html_owned = html.to_string();
        let result = tokio::task::spawn_blocking(move || {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                tokio::runtime::Handle::current()
                    .block_on(async { Readability::extract(&html_owned, Some(url)).await })
            }))
        })
        .await;

        match result {
            Ok(Ok(Ok(text))) if !text.trim().is_empty() => text,
            Ok(Ok(Ok(_))) => simple_html_to_text(html),
            Ok(Ok(Err(e))) => {
                debug!("Readability failed: {}, using simple extraction", e);
                simple_html_to_text(html)
            }
            Ok(Err(_panic)) => {
                warn!("Readability panicked, using simple extraction");
                simple_html_to_text(html)
            }
            Err(e) => {
                warn!("Extraction task failed: {}", e);
                simple_html_to_text(html)
            }
        }
    }
}

/// Strip tags, scripts and styles; block elements become line breaks (pure function)
pub fn simple_html_to_text(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    let mut skipping = false;
    let mut tag_name = String::new();

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag_name.clear();
            }
            '>' if in_tag => {
                let tag = tag_name
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();

                match tag.as_str() {
                    "script" | "style" => skipping = true,
                    "/script" | "/style" => skipping = false,
                    _ => {}
                }

                let bare = tag.trim_start_matches('/').trim_end_matches('/');
                if matches!(
                    bare,
                    "div" | "p" | "br" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
                ) {
                    result.push('\n');
                }

                in_tag = false;
            }
            _ if in_tag => tag_name.push(ch),
            _ if skipping => {}
            c if c.is_whitespace() => {
                if !result.ends_with(' ') && !result.ends_with('\n') {
                    result.push(' ');
                }
            }
            c => result.push(c),
        }
    }

    result
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ScrapeGateway for DirectFetchGateway {
    fn name(&self) -> &str {
        "direct"
    }

    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapedPage, ScrapeError> {
        let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut html = response
            .text()
            .await
            .map_err(|e| ScrapeError::InvalidResponse(e.to_string()))?;
        if html.len() > self.max_response_size {
            let mut cut = self.max_response_size;
            while !html.is_char_boundary(cut) {
                cut -= 1;
            }
            html.truncate(cut);
        }

        let text = if options.only_main_content {
            Self::extract_readable_content(&html, parsed).await
        } else {
            simple_html_to_text(&html)
        };

        if text.trim().is_empty() {
            return Err(ScrapeError::Empty(url.to_string()));
        }

        Ok(ScrapedPage {
            url: url.to_string(),
            markdown: text,
            html: options.wants_html().then_some(html),
        })
    }
}
