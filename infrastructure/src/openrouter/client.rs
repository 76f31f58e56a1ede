//! OpenRouter implementation of the [`ModelInvoker`] port

use super::circuit_breaker::CircuitBreaker;
use super::error::{OpenRouterError, parse_retry_after};
use super::settings::OpenRouterSettings;
use super::types::{ChatRequest, ChatResponse, ErrorBody, build_messages};
use async_trait::async_trait;
use council_application::{InvocationFailure, InvocationOutput, InvocationRequest, ModelInvoker};
use reqwest::Client;
use tracing::{debug, warn};

/// Calls models through OpenRouter's Chat Completions endpoint
///
/// One attempt is bounded by `request_timeout`; transient failures are
/// retried per the [`RetryPolicy`](super::RetryPolicy), and every model has
/// its own circuit.
pub struct OpenRouterInvoker {
    client: Client,
    api_key: String,
    settings: OpenRouterSettings,
    breaker: CircuitBreaker,
}

impl OpenRouterInvoker {
    /// Build an invoker, reading the key from `settings.api_key_env`
    pub fn new(settings: OpenRouterSettings) -> Result<Self, OpenRouterError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| OpenRouterError::MissingApiKey {
                env: settings.api_key_env.clone(),
            })?;
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(
        settings: OpenRouterSettings,
        api_key: impl Into<String>,
    ) -> Result<Self, OpenRouterError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(OpenRouterError::Client)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            breaker: CircuitBreaker::new(settings.breaker.clone()),
            settings,
        })
    }

    pub fn settings(&self) -> &OpenRouterSettings {
        &self.settings
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<InvocationOutput, OpenRouterError> {
        let mut request = self
            .client
            .post(self.settings.completions_url())
            .bearer_auth(&self.api_key)
            .json(body);
        if let Some(referer) = &self.settings.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.settings.app_title {
            request = request.header("X-Title", title);
        }

        let response = request.send().await.map_err(OpenRouterError::from_reqwest)?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(OpenRouterError::status(status.as_u16(), message, retry_after));
        }

        let parsed: ChatResponse = response.json().await.map_err(OpenRouterError::from_reqwest)?;
        let content = parsed
            .first_content()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| OpenRouterError::InvalidResponse("empty content".to_string()))?;

        let mut output = InvocationOutput::new(content);
        if let Some(tokens) = parsed.usage.and_then(|u| u.completion_tokens) {
            output = output.with_token_count(tokens);
        }
        Ok(output)
    }

    async fn invoke_with_retry(
        &self,
        request: &InvocationRequest,
    ) -> Result<InvocationOutput, OpenRouterError> {
        let model = request.model.as_str();
        let body = ChatRequest {
            model,
            messages: build_messages(request),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let policy = &self.settings.retry;
        let mut attempt = 0;
        let mut last_error = None;

        loop {
            // A circuit opened by our own retries reports the failure that opened it
            if let Err(remaining) = self.breaker.try_acquire(model) {
                return Err(last_error.unwrap_or(OpenRouterError::CircuitOpen {
                    model: model.to_string(),
                    remaining,
                }));
            }

            debug!("OpenRouter request: model={}, attempt={}", model, attempt + 1);
            match self.send_once(&body).await {
                Ok(output) => {
                    self.breaker.record_success(model);
                    debug!("OpenRouter response: model={}, length={}", model, output.text.len());
                    return Ok(output);
                }
                Err(error) => {
                    if error.trips_breaker() {
                        self.breaker.record_failure(model);
                    }
                    if !error.is_retryable() || attempt >= policy.max_retries {
                        return Err(error);
                    }
                    let delay = policy.delay_for(attempt, error.retry_after());
                    warn!(
                        "{} failed ({}), retrying in {:.1}s ({}/{})",
                        model,
                        error,
                        delay.as_secs_f64(),
                        attempt + 1,
                        policy.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(error);
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl ModelInvoker for OpenRouterInvoker {
    async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationOutput, InvocationFailure> {
        self.invoke_with_retry(&request).await.map_err(Into::into)
    }
}
