//! Error classification logic

/// Outcome of one physical attempt, as seen by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No response was obtained (connect failure, DNS, timeout before any response).
    Transport,
    /// A response arrived with this HTTP status.
    Status(u16),
}

/// Decide whether an attempt outcome is worth retrying.
pub fn is_retryable(outcome: &Outcome) -> bool {
    match outcome {
        Outcome::Transport => true,
        Outcome::Status(status) => is_retryable_status(*status),
    }
}

/// Status-code retry table.
///
/// Server-side failures lean towards retrying, client-side failures towards not:
/// - 429 and 500/502/503/504 are retryable
/// - 400/401/403/404 are not
/// - any other status >= 500 is retryable as a safety net
/// - everything else (other 4xx, 1xx, 3xx, and 2xx) is not
pub fn is_retryable_status(status: u16) -> bool {
    match status {
        429 => true,
        500 | 502 | 503 | 504 => true,
        400 | 401 | 403 | 404 => false,
        // NOTE: unlisted 5xx stay retryable; whether that is intended is still an open product call.
        s if s >= 500 => true,
        _ => false,
    }
}
