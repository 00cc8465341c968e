//! Shared HTTP transport for the OpenAI-compatible services.
//!
//! Both the generation and embedding clients post a JSON body with a bearer
//! token and read a JSON response. [`post_json`] owns the retry policy:
//!
//! - HTTP 429 and 5xx → retry
//! - network errors and per-call timeouts → retry
//! - any other non-success status → fail immediately
//! - backoff: 1s, 2s, 4s, ... (capped at 32s) plus up to 50% random jitter
//!
//! The retry budget defaults to zero, so out of the box every upstream
//! failure is surfaced to the caller on the first attempt.

use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::error::{AdvisorError, AdvisorResult};

/// Connection settings for one upstream service.
#[derive(Clone)]
pub struct Endpoint {
    pub service: &'static str,
    pub url: String,
    pub api_key: String,
    pub max_retries: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("service", &self.service)
            .field("url", &self.url)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Endpoint {
    pub fn new(
        service: &'static str,
        url: String,
        api_key: String,
        timeout_secs: u64,
        max_retries: u32,
    ) -> AdvisorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            service,
            url,
            api_key,
            max_retries,
            client,
        })
    }
}

/// POST `body` to the endpoint and return the parsed JSON response.
pub async fn post_json(endpoint: &Endpoint, body: &Value) -> AdvisorResult<Value> {
    let mut last_err = None;

    for attempt in 0..=endpoint.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            warn!(
                service = endpoint.service,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying upstream call"
            );
            tokio::time::sleep(delay).await;
        }

        let resp = endpoint
            .client
            .post(&endpoint.url)
            .header("Authorization", format!("Bearer {}", endpoint.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;

        let err = match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json::<Value>().await.map_err(|e| {
                        AdvisorError::Schema(format!(
                            "{} service returned a non-JSON body: {}",
                            endpoint.service, e
                        ))
                    });
                }

                AdvisorError::Upstream {
                    service: endpoint.service,
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                }
            }
            Err(e) => AdvisorError::Transport {
                service: endpoint.service,
                message: e.to_string(),
            },
        };

        if !err.is_retryable() {
            return Err(err);
        }
        last_err = Some(err);
    }

    Err(last_err.unwrap_or_else(|| AdvisorError::Transport {
        service: endpoint.service,
        message: "request failed after retries".to_string(),
    }))
}

/// Exponential backoff for retry `attempt` (1-based) with random jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = 1000u64 << (attempt - 1).min(5);
    let jitter_ms = rand::thread_rng().gen_range(0..=base_ms / 2);
    Duration::from_millis(base_ms + jitter_ms)
}
