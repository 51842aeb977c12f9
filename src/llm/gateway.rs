//! Rate-limited access to the configured LLM
//!
//! [`ClassifierGateway`] is the only path through which the coordinator and the
//! agents reach a model. It is cheap to clone; every clone shares one
//! [`RateLimiter`], so classification and answer generation are spaced by the
//! same cooldown.

use crate::gateway_span;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, ResponseFormat,
};
use crate::llm::rate_limit::RateLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Instrument};

/// Tunables for gateway calls
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: Some(0.2),
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct ClassifierGateway {
    provider: Arc<dyn LlmProvider>,
    limiter: Arc<RateLimiter>,
    settings: GatewaySettings,
}

impl ClassifierGateway {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        limiter: Arc<RateLimiter>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            provider,
            limiter,
            settings,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Structured-decision mode: ask for JSON in the given format, return raw text
    ///
    /// Empty content comes back as an empty string; judging it is the decoder's job.
    pub async fn classify(&self, prompt: &str, format: ResponseFormat) -> Result<String, LlmError> {
        let response = self.call("classify", prompt, format).await?;
        Ok(response.content.unwrap_or_default())
    }

    /// Free-text answer mode
    pub async fn answer(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.call("answer", prompt, ResponseFormat::Text).await?;
        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::InvalidResponse(format!(
                "empty response (finish reason {:?})",
                response.finish_reason
            ))),
        }
    }

    async fn call(
        &self,
        mode: &'static str,
        prompt: &str,
        format: ResponseFormat,
    ) -> Result<CompletionResponse, LlmError> {
        let span = gateway_span!(
            mode,
            provider = self.provider.name(),
            model = %self.settings.model
        );

        async {
            let waited = self.limiter.acquire().await;
            debug!(waited_ms = waited.as_millis() as u64, prompt_len = prompt.len(), "Calling LLM");

            let request = CompletionRequest {
                messages: vec![Message::user(prompt)],
                model: self.settings.model.clone(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                response_format: Some(format),
                metadata: HashMap::from([("mode".to_string(), mode.to_string())]),
            };

            tokio::time::timeout(self.settings.timeout, self.provider.complete(request))
                .await
                .map_err(|_| LlmError::Timeout(self.settings.timeout.as_secs()))?
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for ClassifierGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierGateway")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .field("min_interval", &self.limiter.min_interval())
            .finish()
    }
}
