use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{PipeRequest, PipeResponse};
use crate::config::{LangbaseConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};

/// Client for the Langbase Pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_config: RequestConfig,
}

impl std::fmt::Debug for LangbaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangbaseClient")
            .field("base_url", &self.base_url)
            .field("request_config", &self.request_config)
            .finish_non_exhaustive()
    }
}

/// 4xx other than 408/429 will fail the same way on retry.
fn is_retryable(error: &LangbaseError) -> bool {
    match error {
        LangbaseError::Api { status, .. } => {
            !(400..500).contains(status) || *status == 408 || *status == 429
        }
        LangbaseError::InvalidResponse { .. } => false,
        _ => true,
    }
}

impl LangbaseClient {
    /// Create a new Langbase client
    pub fn new(config: &LangbaseConfig, request_config: RequestConfig) -> LangbaseResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LangbaseError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// Delay before `attempt` (1-based): none for the first, then
    /// `retry_delay_ms` doubling per attempt.
    fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt <= 1 {
            return None;
        }
        let factor = 1_u64 << (attempt - 2).min(16);
        Some(Duration::from_millis(
            self.request_config.retry_delay_ms.saturating_mul(factor),
        ))
    }

    /// Run a pipe, retrying transient failures with exponential backoff.
    ///
    /// Gives up early on errors a retry cannot fix. `Unavailable.retries`
    /// reports the number of attempts made.
    pub async fn call_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let attempts = self.request_config.max_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            if let Some(delay) = self.backoff(attempt) {
                debug!(pipe = %request.name, attempt, delay_ms = delay.as_millis(), "Backing off");
                tokio::time::sleep(delay).await;
            }

            let started = Instant::now();
            match self.send(&url, &request).await {
                Ok(response) => {
                    info!(
                        pipe = %request.name,
                        attempt,
                        latency_ms = started.elapsed().as_millis(),
                        tokens = ?response.total_tokens(),
                        "Langbase pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) if !is_retryable(&e) => {
                    error!(pipe = %request.name, error = %e, "Langbase pipe call rejected");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        pipe = %request.name,
                        attempt,
                        attempts,
                        error = %e,
                        latency_ms = started.elapsed().as_millis(),
                        "Langbase pipe call failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(LangbaseError::Unavailable {
            message: last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string()),
            retries: attempts,
        })
    }

    /// Run a pipe and return its completion text.
    ///
    /// A response with `success: false` is treated as an invalid response.
    pub async fn complete(&self, request: PipeRequest) -> LangbaseResult<String> {
        let pipe_name = request.name.clone();
        let response = self.call_pipe(request).await?;
        if !response.success {
            return Err(LangbaseError::InvalidResponse {
                message: format!("Pipe '{}' reported success=false", pipe_name),
            });
        }
        Ok(response.completion)
    }

    async fn send(&self, url: &str, request: &PipeRequest) -> LangbaseResult<PipeResponse> {
        debug!(pipe = %request.name, messages = request.messages.len(), "Calling Langbase pipe");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&body).map_err(|e| LangbaseError::InvalidResponse {
            message: format!("Pipe '{}' returned unparseable body: {}", request.name, e),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> LangbaseError {
        if e.is_timeout() {
            LangbaseError::Timeout {
                timeout_ms: self.request_config.timeout_ms,
            }
        } else {
            LangbaseError::Http(e)
        }
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
