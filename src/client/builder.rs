use crate::client::core::RequestExecutor;
use crate::client::policy::RetryPolicy;
use crate::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`RequestExecutor`].
///
/// Anything left unset is resolved at `build()` time, from env where noted.
pub struct RequestExecutorBuilder {
    transport: Option<Arc<dyn Transport>>,
    policy: Option<Arc<RetryPolicy>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    attempt_timeout: Option<Duration>,
    jitter_seed: Option<u64>,
}

impl RequestExecutorBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            policy: None,
            rate_limiter: None,
            attempt_timeout: None,
            jitter_seed: None,
        }
    }

    /// Use a custom transport. Default: [`HttpTransport::new`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Default: [`RetryPolicy::from_env`].
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// Share one policy value across several executors.
    pub fn shared_policy(mut self, policy: Arc<RetryPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Enable a token-bucket rate limiter.
    ///
    /// Can also be enabled via env: `RESILIENT_RPS` (requests per second).
    /// Invalid values (negative, NaN) leave the limiter disabled.
    pub fn rate_limit_rps(mut self, rps: f64) -> Self {
        if let Some(cfg) = RateLimiterConfig::from_rps(rps) {
            self.rate_limiter = Some(Arc::new(RateLimiter::new(cfg)));
        }
        self
    }

    /// Only honor server-reported exhaustion; no local rate.
    pub fn adaptive_rate_limit(mut self) -> Self {
        self.rate_limiter = Some(Arc::new(RateLimiter::new(RateLimiterConfig::adaptive())));
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Abort an attempt that runs longer than `timeout`; it counts as a transport failure.
    ///
    /// Env: `RESILIENT_ATTEMPT_TIMEOUT_MS`.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    /// Seed the jitter source so backoff sequences are reproducible.
    pub fn jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<RequestExecutor> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };

        let policy = match self.policy {
            Some(p) => p,
            None => Arc::new(RetryPolicy::from_env()?),
        };

        let attempt_timeout = self.attempt_timeout.or_else(|| {
            std::env::var("RESILIENT_ATTEMPT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
        });

        let rate_limiter = self.rate_limiter.or_else(|| {
            std::env::var("RESILIENT_RPS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .and_then(RateLimiterConfig::from_rps)
                .map(|cfg| Arc::new(RateLimiter::new(cfg)))
        });

        Ok(RequestExecutor {
            transport,
            policy,
            rate_limiter,
            attempt_timeout,
            jitter_seed: self.jitter_seed,
        })
    }
}

impl Default for RequestExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
