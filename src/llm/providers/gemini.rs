//! Google Gemini provider implementation
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.
//! System messages become the `systemInstruction`, assistant turns use the
//! `model` role, and JSON output is requested through `responseMimeType`.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, ResponseFormat, TokenUsage,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Gemini provider configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "Gemini API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Split messages into system instruction and contents (pure function)
    fn convert_messages(messages: &[Message]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            match message.role {
                MessageRole::System => system_parts.push(GeminiPart {
                    text: message.content.clone(),
                }),
                MessageRole::User | MessageRole::Assistant => {
                    let role = if message.role == MessageRole::User {
                        "user"
                    } else {
                        "model"
                    };
                    contents.push(GeminiContent {
                        role: Some(role.to_string()),
                        parts: vec![GeminiPart {
                            text: message.content.clone(),
                        }],
                    });
                }
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        (system_instruction, contents)
    }

    /// Build the wire request (pure function)
    fn convert_to_gemini_request(request: &CompletionRequest) -> GeminiRequest {
        let (system_instruction, contents) = Self::convert_messages(&request.messages);

        let response_mime_type = request
            .response_format
            .as_ref()
            .filter(|format| format.wants_json())
            .map(|_| "application/json".to_string());

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type,
            },
        }
    }

    /// Parse the wire response (pure function)
    fn parse_completion_response(
        gemini_response: GeminiResponse,
        model: &str,
        metadata: HashMap<String, String>,
    ) -> Result<CompletionResponse, LlmError> {
        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ApiError("No candidates returned from Gemini".to_string()))?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty());

        let usage = gemini_response
            .usage_metadata
            .map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: text,
            model: gemini_response
                .model_version
                .unwrap_or_else(|| model.to_string()),
            usage,
            finish_reason: Self::convert_finish_reason(candidate.finish_reason.as_deref()),
            metadata,
        })
    }

    /// Convert Gemini finish reason to internal format (pure function)
    fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        }
    }

    /// Map a non-success status to an error (pure function)
    fn classify_status(status: StatusCode, body: &str) -> LlmError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                LlmError::RateLimitExceeded(format!("Gemini API error: {status} - {body}"))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LlmError::AuthenticationFailed(format!("Gemini API error: {status} - {body}"))
            }
            StatusCode::NOT_FOUND => LlmError::ModelNotFound(body.to_string()),
            s if s.is_server_error() => {
                LlmError::ApiError(format!("Gemini API server error: {status} - {body}"))
            }
            _ => LlmError::ApiError(format!("Gemini API error: {status} - {body}")),
        }
    }

    /// Retry orchestrator, network and server errors only
    async fn complete_with_retry(
        &self,
        model: &str,
        gemini_request: GeminiRequest,
        metadata: HashMap<String, String>,
    ) -> Result<CompletionResponse, LlmError> {
        let backoff_delays = [100u64, 200, 300];
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(backoff_delays.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!(attempt, delay_ms, "Gemini retry");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.make_api_request(model, &gemini_request).await {
                Ok(gemini_response) => {
                    let response =
                        Self::parse_completion_response(gemini_response, model, metadata)?;
                    debug!(
                        total_tokens = response.usage.total_tokens,
                        finish_reason = ?response.finish_reason,
                        "Gemini response"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Gemini request attempt {} failed: {}", attempt + 1, e);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        error!("Gemini request failed after all retries");
        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    /// Make single API request
    async fn make_api_request(
        &self,
        model: &str,
        gemini_request: &GeminiRequest,
    ) -> Result<GeminiResponse, LlmError> {
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.base_url, model
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout.as_secs())
                } else {
                    LlmError::NetworkError(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn available_models(&self) -> Vec<String> {
        vec![
            "gemini-2.5-flash".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-2.0-flash".to_string(),
            "gemini-1.5-flash".to_string(),
        ]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let gemini_request = Self::convert_to_gemini_request(&request);
        debug!(
            model = %request.model,
            contents = gemini_request.contents.len(),
            json = gemini_request.generation_config.response_mime_type.is_some(),
            "Gemini request"
        );

        self.complete_with_retry(&request.model, gemini_request, request.metadata)
            .await
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::AuthenticationFailed(
                "Gemini API authentication failed".to_string(),
            ))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
