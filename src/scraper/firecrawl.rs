//! Firecrawl scrape API client
//!
//! `POST {base_url}/v1/scrape` with a bearer key. The API answers 200 with
//! `success: false` for pages it could not render, which is treated the same
//! as a transport failure.

use super::{ContentFormat, ScrapeError, ScrapeGateway, ScrapeOptions, ScrapedPage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FirecrawlConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.firecrawl.dev".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct FirecrawlClient {
    config: FirecrawlConfig,
    client: Client,
}

impl FirecrawlClient {
    pub fn new(config: FirecrawlConfig) -> Result<Self, ScrapeError> {
        if config.api_key.is_empty() {
            return Err(ScrapeError::NotConfigured(
                "Firecrawl API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Build the request body (pure function)
    fn build_request<'a>(url: &'a str, options: &'a ScrapeOptions) -> FirecrawlScrapeRequest<'a> {
        FirecrawlScrapeRequest {
            url,
            formats: &options.formats,
            only_main_content: options.only_main_content,
        }
    }

    /// Turn the API envelope into a page or an error (pure function)
    fn parse_response(url: &str, response: FirecrawlScrapeResponse) -> Result<ScrapedPage, ScrapeError> {
        if !response.success {
            return Err(ScrapeError::Rejected {
                url: url.to_string(),
                reason: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let data = response
            .data
            .ok_or_else(|| ScrapeError::InvalidResponse("missing data field".to_string()))?;

        let markdown = data.markdown.unwrap_or_default();
        if markdown.trim().is_empty() && data.html.as_deref().map_or(true, str::is_empty) {
            return Err(ScrapeError::Empty(url.to_string()));
        }

        Ok(ScrapedPage {
            url: url.to_string(),
            markdown,
            html: data.html,
        })
    }

    async fn scrape_once(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapedPage, ScrapeError> {
        let response = self
            .client
            .post(format!("{}/v1/scrape", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&Self::build_request(url, options))
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Error bodies still carry the success/error envelope
            if let Ok(envelope) = serde_json::from_str::<FirecrawlScrapeResponse>(&body) {
                if let Some(reason) = envelope.error {
                    if !status.is_server_error() {
                        return Err(ScrapeError::Rejected {
                            url: url.to_string(),
                            reason,
                        });
                    }
                }
            }
            return Err(ScrapeError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let envelope: FirecrawlScrapeResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::InvalidResponse(e.to_string()))?;

        Self::parse_response(url, envelope)
    }
}

#[async_trait]
impl ScrapeGateway for FirecrawlClient {
    fn name(&self) -> &str {
        "firecrawl"
    }

    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapedPage, ScrapeError> {
        let backoff_delays = [100u64, 200, 300];
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(backoff_delays.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!(attempt, delay_ms, url, "Firecrawl retry");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.scrape_once(url, options).await {
                Ok(page) => {
                    debug!(url, markdown_len = page.markdown.len(), "Firecrawl scrape succeeded");
                    return Ok(page);
                }
                Err(e) => {
                    warn!("Firecrawl attempt {} for {} failed: {}", attempt + 1, url, e);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ScrapeError::Network("All retry attempts failed".to_string())))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FirecrawlScrapeRequest<'a> {
    url: &'a str,
    formats: &'a [ContentFormat],
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<FirecrawlData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlData {
    markdown: Option<String>,
    html: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = FirecrawlClient::new(FirecrawlConfig::default());
        assert!(matches!(result, Err(ScrapeError::NotConfigured(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let options = ScrapeOptions::full_page();
        let body = serde_json::to_value(FirecrawlClient::build_request("https://x.test", &options)).unwrap();

        assert_eq!(body["url"], "https://x.test");
        assert_eq!(body["formats"], serde_json::json!(["markdown", "html"]));
        assert_eq!(body["onlyMainContent"], false);
    }

    #[test]
    fn test_unsuccessful_envelope_is_rejected() {
        let envelope: FirecrawlScrapeResponse =
            serde_json::from_value(serde_json::json!({"success": false, "error": "blocked"})).unwrap();
        let result = FirecrawlClient::parse_response("https://x.test", envelope);

        assert_eq!(
            result,
            Err(ScrapeError::Rejected {
                url: "https://x.test".to_string(),
                reason: "blocked".to_string()
            })
        );
    }

    #[test]
    fn test_empty_content_is_error() {
        let envelope: FirecrawlScrapeResponse =
            serde_json::from_value(serde_json::json!({"success": true, "data": {"markdown": "  "}}))
                .unwrap();
        let result = FirecrawlClient::parse_response("https://x.test", envelope);
        assert!(matches!(result, Err(ScrapeError::Empty(_))));
    }

    #[test]
    fn test_successful_envelope() {
        let envelope: FirecrawlScrapeResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "data": {"markdown": "# CMPUT 174", "html": "<h1>CMPUT 174</h1>"}
        }))
        .unwrap();
        let page = FirecrawlClient::parse_response("https://x.test", envelope).unwrap();

        assert_eq!(page.markdown, "# CMPUT 174");
        assert_eq!(page.html.as_deref(), Some("<h1>CMPUT 174</h1>"));
    }
}
