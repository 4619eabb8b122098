use crate::client::rate_limit::RateLimitSnapshot;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a call was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller fired the token.
    Cancelled,
    /// The handle's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => f.write_str("cancelled by caller"),
            CancelReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Caller-side cancellation signal with an optional deadline.
///
/// Clones share the same token, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe an existing token (e.g. one shared with other tasks).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A timeout too large to represent as an instant leaves the handle without a deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Current state without waiting. An explicit cancel wins over an expired deadline.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves once the token fires or the deadline passes.
    pub async fn cancelled(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelReason::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }
}

/// Per-call statistics for observability.
#[derive(Debug, Clone, Default)]
pub struct CallStats {
    /// Correlation id generated for this logical call and sent on every attempt.
    pub client_request_id: String,
    /// Correlation id reported by the server on the last response.
    pub upstream_request_id: Option<String>,
    /// Physical attempts made (initial + retries).
    pub attempts: u32,
    pub retry_count: u32,
    /// Status of the last response, if any response was received.
    pub http_status: Option<u16>,
    pub duration_ms: u128,
    /// Time spent sleeping between attempts.
    pub total_wait_ms: u128,
    pub rate_limit: Option<RateLimitSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clone_shares_token() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert_eq!(clone.reason(), Some(CancelReason::Cancelled));
        assert_eq!(clone.cancelled().await, CancelReason::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let handle = CancelHandle::new().with_timeout(Duration::from_secs(2));
        assert!(!handle.is_cancelled());
        assert_eq!(handle.cancelled().await, CancelReason::DeadlineExceeded);
        assert_eq!(handle.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let handle = CancelHandle::new().with_timeout(Duration::MAX);
        assert!(handle.deadline().is_none());
        assert!(!handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancel_wins_over_expired_deadline() {
        let handle = CancelHandle::new().with_timeout(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.cancel();
        assert_eq!(handle.reason(), Some(CancelReason::Cancelled));
        assert_eq!(handle.cancelled().await, CancelReason::Cancelled);
    }
}
