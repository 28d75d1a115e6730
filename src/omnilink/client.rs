use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{CircuitBreaker, CircuitState, EventQueue, OmniLinkEvent};
use crate::config::{OmniLinkConfig, RequestConfig};
use crate::error::{OmniLinkError, OmniLinkResult};

/// Outcome of one [`OmniLinkClient::flush`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlushReport {
    pub sent: usize,
    pub remaining: usize,
    pub circuit_state: CircuitState,
    /// Error that stopped the flush, if any
    pub error: Option<String>,
}

/// Queues milestones and posts them to the OmniLink webhook.
#[derive(Debug)]
pub struct OmniLinkClient {
    http: Client,
    /// `None` when the integration is disabled
    webhook_url: Option<String>,
    queue: EventQueue,
    breaker: CircuitBreaker,
}

impl OmniLinkClient {
    /// Create a client. Without `enabled` and a webhook URL it stays inert.
    pub fn new(config: &OmniLinkConfig, request_config: &RequestConfig) -> OmniLinkResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(OmniLinkError::Http)?;

        let webhook_url = match (config.enabled, &config.webhook_url) {
            (true, Some(url)) => Some(url.clone()),
            (true, None) => {
                warn!("OmniLink enabled without a webhook URL; staying disabled");
                None
            }
            (false, _) => None,
        };

        Ok(Self {
            http,
            webhook_url,
            queue: EventQueue::new(config.queue_capacity),
            breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Queue an event for the next flush. No-op when disabled.
    pub fn enqueue(&mut self, event: OmniLinkEvent) {
        if !self.is_enabled() {
            return;
        }
        debug!(event_id = %event.id, kind = %event.kind, "OmniLink event queued");
        self.queue.push(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Events evicted by queue overflow.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Deliver queued events in order until the queue drains, a delivery
    /// fails, or the breaker refuses.
    pub async fn flush(&mut self) -> FlushReport {
        let mut sent = 0;
        let mut error = None;

        if let Some(url) = self.webhook_url.clone() {
            while !self.queue.is_empty() {
                if !self.breaker.allow(Utc::now()) {
                    error = Some(
                        OmniLinkError::CircuitOpen {
                            consecutive_failures: self.breaker.failure_streak(),
                        }
                        .to_string(),
                    );
                    break;
                }
                let Some(event) = self.queue.pop() else {
                    break;
                };

                match self.deliver(&url, &event).await {
                    Ok(()) => {
                        self.breaker.on_delivered();
                        sent += 1;
                    }
                    Err(e) => {
                        warn!(event_id = %event.id, error = %e, "OmniLink delivery failed");
                        self.breaker.on_failed(Utc::now());
                        self.queue.requeue_front(event);
                        error = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        let report = FlushReport {
            sent,
            remaining: self.queue.len(),
            circuit_state: self.breaker.state(),
            error,
        };
        if report.sent > 0 || report.error.is_some() {
            info!(
                sent = report.sent,
                remaining = report.remaining,
                circuit = %report.circuit_state,
                "OmniLink flush finished"
            );
        }
        report
    }

    async fn deliver(&self, url: &str, event: &OmniLinkEvent) -> OmniLinkResult<()> {
        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-OmniLink-Event", event.kind.as_str())
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OmniLinkError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
