//! Rate limit retry policy.
//!
//! When the model service returns 429 the request is retried after an
//! exponential backoff. Every other gateway error is returned on the first
//! attempt.

use std::time::Duration;

use async_trait::async_trait;

use super::client::LlmGateway;
use super::types::{CompletionRequest, CompletionResponse, GatewayError};

/// How often and how patiently to retry rate-limited calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying).
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(64),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// The delay is the maximum of the service's `retry_after` and
    /// `initial_backoff * 2^retry`, capped at `max_backoff`.
    pub fn delay_for(&self, retry: u32, retry_after: Duration) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        let exp_backoff = self.initial_backoff.saturating_mul(factor);
        retry_after.max(exp_backoff).min(self.max_backoff)
    }
}

/// Gateway decorator that retries rate-limited calls according to a policy.
#[derive(Debug)]
pub struct RetryingGateway<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: LlmGateway> RetryingGateway<G> {
    /// Wrap a gateway with a retry policy.
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<G: LlmGateway> LlmGateway for RetryingGateway<G> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        let mut retry = 0;
        loop {
            match self.inner.complete(request.clone()).await {
                Err(GatewayError::RateLimited { retry_after }) if retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for(retry, retry_after);
                    retry += 1;
                    tracing::warn!(
                        gateway = self.inner.name(),
                        retry,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
