use crate::client::builder::RequestExecutorBuilder;
use crate::client::policy::RetryPolicy;
use crate::client::types::CancelHandle;
use crate::resilience::rate_limiter::{RateLimiter, RateLimiterSnapshot};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Runs one logical call as a bounded sequence of physical attempts.
///
/// Holds no per-call state: any number of calls may run concurrently against
/// the same executor, each with its own attempt loop.
pub struct RequestExecutor {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) policy: Arc<RetryPolicy>,
    pub(crate) rate_limiter: Option<Arc<RateLimiter>>,
    pub(crate) attempt_timeout: Option<Duration>,
    pub(crate) jitter_seed: Option<u64>,
}

impl RequestExecutor {
    /// Executor over `transport` with the default [`RetryPolicy`].
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            policy: Arc::new(RetryPolicy::default()),
            rate_limiter: None,
            attempt_timeout: None,
            jitter_seed: None,
        }
    }

    pub fn builder() -> RequestExecutorBuilder {
        RequestExecutorBuilder::new()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Current throttle state, if a rate limiter is configured.
    pub async fn rate_limiter_snapshot(&self) -> Option<RateLimiterSnapshot> {
        match &self.rate_limiter {
            Some(rl) => Some(rl.snapshot().await),
            None => None,
        }
    }

    /// Execute `request`, retrying transient failures per the policy.
    pub async fn execute(&self, request: &ApiRequest, cancel: &CancelHandle) -> Result<ApiResponse> {
        Ok(self.execute_with_stats(request, cancel).await?.0)
    }

    /// Execute and decode the successful body as JSON.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        cancel: &CancelHandle,
    ) -> Result<T> {
        self.execute(request, cancel).await?.json()
    }
}
