//! Rate-limit extraction from response headers.

use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const LIMIT_HEADERS: &[&str] = &["x-ratelimit-limit", "x-ratelimit-limit-requests"];
const REMAINING_HEADERS: &[&str] = &["x-ratelimit-remaining", "x-ratelimit-remaining-requests"];
const RESET_HEADERS: &[&str] = &["x-ratelimit-reset"];
const RETRY_AFTER_HEADERS: &[&str] = &["retry-after"];

/// Rate-limit facts reported by one response. Zero / `None` means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// Requests allowed per window.
    pub limit: u64,
    pub remaining: u64,
    /// When the window resets.
    pub reset: Option<SystemTime>,
    /// Server-requested wait; only set on throttling responses.
    pub retry_after: Duration,
}

impl RateLimitSnapshot {
    /// Parse the recognized headers. Never fails: a missing or malformed header
    /// leaves its field at the zero value.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let limit = parse_u64(headers, LIMIT_HEADERS).unwrap_or(0);
        let remaining = parse_u64(headers, REMAINING_HEADERS).unwrap_or(0);
        let reset = parse_u64(headers, RESET_HEADERS)
            .and_then(|secs| UNIX_EPOCH.checked_add(Duration::from_secs(secs)));
        let retry_after = parse_u64(headers, RETRY_AFTER_HEADERS)
            .map(Duration::from_secs)
            .unwrap_or_default();

        Self {
            limit,
            remaining,
            reset,
            retry_after,
        }
    }

    /// The server's retry hint, if it sent a positive one.
    pub fn retry_hint(&self) -> Option<Duration> {
        (!self.retry_after.is_zero()).then_some(self.retry_after)
    }

    /// True when the server reported a quota and it is used up.
    pub fn is_exhausted(&self) -> bool {
        self.limit > 0 && self.remaining == 0
    }

    /// Time from `now` until the reset instant; `None` if unset or already past.
    pub fn reset_after(&self, now: SystemTime) -> Option<Duration> {
        self.reset?.duration_since(now).ok().filter(|d| !d.is_zero())
    }
}

/// Extract the first non-empty value among `names`.
pub(crate) fn header_first(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(v) = headers.get(*name) {
            if let Ok(s) = v.to_str() {
                let s = s.trim();
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

fn parse_u64(headers: &HeaderMap, names: &[&str]) -> Option<u64> {
    header_first(headers, names)?.parse::<u64>().ok()
}
