use crate::client::rate_limit::RateLimitSnapshot;
use crate::client::types::{CancelHandle, CancelReason};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fallback block when the server reports an empty budget without saying when it resets.
const DEFAULT_BLOCK: Duration = Duration::from_secs(1);

/// Longest block a single response can impose; server-supplied waits beyond this are clamped.
const MAX_BLOCK: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub rps: f64,
    pub burst: f64,
    pub tokens: f64,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Tokens per second. Zero disables the local bucket and leaves only
    /// server-driven blocking.
    pub rps: f64,
    /// Maximum burst size (tokens).
    pub burst: f64,
}

impl RateLimiterConfig {
    pub fn from_rps(rps: f64) -> Option<Self> {
        if !rps.is_finite() || rps < 0.0 {
            return None;
        }
        Some(Self {
            rps,
            burst: rps.max(1.0), // default burst: 1 second worth, at least 1
        })
    }

    /// Server-driven only: never throttles locally, but honors exhausted budgets.
    pub fn adaptive() -> Self {
        Self { rps: 0.0, burst: 1.0 }
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = f64::from(burst.max(1));
        self
    }
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last: Instant,
    /// Instant until which the server told us to hold off.
    blocked_until: Option<Instant>,
}

/// Token-bucket limiter fed by the rate-limit headers of each response.
///
/// Optional and per-executor; waits are cancellable.
#[derive(Debug)]
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        let burst = cfg.burst;
        let state = Mutex::new(State {
            tokens: burst,
            last: Instant::now(),
            blocked_until: None,
        });
        Self { cfg, state }
    }

    fn refill_locked(cfg: &RateLimiterConfig, st: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(st.last).as_secs_f64();
        if elapsed > 0.0 {
            st.tokens = (st.tokens + elapsed * cfg.rps).min(cfg.burst);
            st.last = now;
        }
    }

    /// Take one token, sleeping as needed. Returns early if `cancel` fires.
    pub async fn acquire(&self, cancel: &CancelHandle) -> Result<(), CancelReason> {
        loop {
            let wait = {
                let mut st = self.state.lock().await;
                let now = Instant::now();

                match st.blocked_until {
                    Some(until) if until > now => until - now,
                    _ => {
                        st.blocked_until = None;
                        if self.cfg.rps <= 0.0 {
                            return Ok(());
                        }
                        Self::refill_locked(&self.cfg, &mut st);
                        if st.tokens >= 1.0 {
                            st.tokens -= 1.0;
                            return Ok(());
                        }
                        Duration::from_secs_f64((1.0 - st.tokens) / self.cfg.rps)
                    }
                }
            };

            tokio::select! {
                biased;
                reason = cancel.cancelled() => return Err(reason),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Feed the facts from a response.
    ///
    /// An exhausted budget (or a retry-after hint) blocks until the reset
    /// instant; a budget with room left clears any block.
    pub async fn observe(&self, snapshot: &RateLimitSnapshot) {
        let mut st = self.state.lock().await;
        if let Some(hint) = snapshot.retry_hint() {
            st.blocked_until = Some(block_until(hint));
        } else if snapshot.is_exhausted() {
            let after = snapshot
                .reset_after(SystemTime::now())
                .unwrap_or(DEFAULT_BLOCK);
            st.blocked_until = Some(block_until(after));
        } else if snapshot.limit > 0 {
            st.blocked_until = None;
        }
    }

    pub async fn snapshot(&self) -> RateLimiterSnapshot {
        let cfg = &self.cfg;
        let mut st = self.state.lock().await;
        let now = Instant::now();

        let mut wait_ms = st
            .blocked_until
            .filter(|until| *until > now)
            .map(|until| (until - now).as_millis() as u64);

        if cfg.rps > 0.0 {
            Self::refill_locked(cfg, &mut st);
            if st.tokens < 1.0 {
                let local_wait_ms = ((1.0 - st.tokens) / cfg.rps * 1000.0) as u64;
                wait_ms = Some(wait_ms.unwrap_or(0).max(local_wait_ms));
            }
        }

        RateLimiterSnapshot {
            rps: cfg.rps,
            burst: cfg.burst,
            tokens: st.tokens,
            estimated_wait_ms: wait_ms,
        }
    }

    /// Take a token without waiting.
    pub async fn try_acquire(&self) -> bool {
        let mut st = self.state.lock().await;
        if let Some(until) = st.blocked_until {
            if until > Instant::now() {
                return false;
            }
            st.blocked_until = None;
        }
        if self.cfg.rps <= 0.0 {
            return true;
        }
        Self::refill_locked(&self.cfg, &mut st);
        if st.tokens >= 1.0 {
            st.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

fn block_until(wait: Duration) -> Instant {
    Instant::now() + wait.min(MAX_BLOCK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exhausted(reset_in: Option<Duration>) -> RateLimitSnapshot {
        RateLimitSnapshot {
            limit: 100,
            remaining: 0,
            reset: reset_in.map(|d| SystemTime::now() + d),
            retry_after: Duration::ZERO,
        }
    }

    #[test]
    fn test_rate_limiter_config_from_rps() {
        let config = RateLimiterConfig::from_rps(10.0).unwrap();
        assert_eq!(config.rps, 10.0);
        assert_eq!(config.burst, 10.0);

        let low = RateLimiterConfig::from_rps(0.5).unwrap();
        assert_eq!(low.burst, 1.0);

        assert!(RateLimiterConfig::from_rps(-1.0).is_none());
        assert!(RateLimiterConfig::from_rps(f64::NAN).is_none());
        assert!(RateLimiterConfig::from_rps(f64::INFINITY).is_none());
    }

    #[tokio::test]
    async fn test_try_acquire_drains_burst() {
        let limiter = RateLimiter::new(RateLimiterConfig::from_rps(1.0).unwrap().with_burst(3));
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn test_adaptive_never_throttles_locally() {
        let limiter = RateLimiter::new(RateLimiterConfig::adaptive());
        let cancel = CancelHandle::new();
        for _ in 0..50 {
            assert!(limiter.acquire(&cancel).await.is_ok());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_blocks_until_reset() {
        let limiter = RateLimiter::new(RateLimiterConfig::adaptive());
        limiter.observe(&exhausted(None)).await;

        let snap = limiter.snapshot().await;
        assert!(snap.estimated_wait_ms.unwrap() > 0);
        assert!(!limiter.try_acquire().await);

        let start = Instant::now();
        limiter.acquire(&CancelHandle::new()).await.unwrap();
        assert!(start.elapsed() >= DEFAULT_BLOCK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_hint_blocks_and_room_unblocks() {
        let limiter = RateLimiter::new(RateLimiterConfig::adaptive());
        limiter
            .observe(&RateLimitSnapshot {
                retry_after: Duration::from_secs(3),
                ..Default::default()
            })
            .await;
        assert!(!limiter.try_acquire().await);

        limiter
            .observe(&RateLimitSnapshot {
                limit: 100,
                remaining: 10,
                ..Default::default()
            })
            .await;
        assert!(limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_retry_after_is_clamped() {
        let limiter = RateLimiter::new(RateLimiterConfig::adaptive());
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "retry-after",
            reqwest::header::HeaderValue::from_static("18446744073709551615"),
        );
        let snapshot = RateLimitSnapshot::from_headers(&headers);
        assert_eq!(snapshot.retry_after, Duration::from_secs(u64::MAX));

        limiter.observe(&snapshot).await;

        let wait_ms = limiter.snapshot().await.estimated_wait_ms.unwrap();
        assert_eq!(wait_ms, MAX_BLOCK.as_millis() as u64);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_far_future_reset_is_clamped() {
        let limiter = RateLimiter::new(RateLimiterConfig::adaptive());
        let snapshot = RateLimitSnapshot {
            limit: 100,
            remaining: 0,
            reset: SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(i64::MAX as u64 / 2)),
            retry_after: Duration::ZERO,
        };
        limiter.observe(&snapshot).await;

        let wait_ms = limiter.snapshot().await.estimated_wait_ms.unwrap();
        assert_eq!(wait_ms, MAX_BLOCK.as_millis() as u64);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_is_cancellable() {
        let limiter = RateLimiter::new(RateLimiterConfig::adaptive());
        limiter
            .observe(&RateLimitSnapshot {
                retry_after: Duration::from_secs(30),
                ..Default::default()
            })
            .await;

        let cancel = CancelHandle::new().with_timeout(Duration::from_millis(100));
        let start = Instant::now();
        let res = limiter.acquire(&cancel).await;
        assert_eq!(res, Err(CancelReason::DeadlineExceeded));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_bucket_refills() {
        let limiter = RateLimiter::new(RateLimiterConfig::from_rps(100.0).unwrap().with_burst(5));
        for _ in 0..5 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(limiter.try_acquire().await);
    }
}
