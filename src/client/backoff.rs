//! Exponential backoff with symmetric jitter.

use crate::client::policy::RetryPolicy;
use rand::Rng;
use std::time::Duration;

/// Jitter spread as a fraction of the capped delay (±20%).
pub const JITTER_FRACTION: f64 = 0.2;

/// Delay to sleep before retrying after the failure of attempt `attempt` (0-based).
///
/// `min(base * 2^attempt, max_delay)`, then perturbed by a uniform draw in
/// `[-20%, +20%]` of that value. A jittered value below zero falls back to the
/// base delay instead of zero. Deterministic for a seeded `rng`.
pub fn backoff_delay<R: Rng + ?Sized>(policy: &RetryPolicy, attempt: u32, rng: &mut R) -> Duration {
    let delay = capped_delay(policy, attempt);

    let secs = delay.as_secs_f64();
    let spread = secs * JITTER_FRACTION;
    let jitter = if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    };

    let jittered = secs + jitter;
    if jittered < 0.0 || !jittered.is_finite() {
        return policy.base_delay();
    }
    // Near `Duration::MAX` the jittered value can exceed what a Duration holds.
    Duration::try_from_secs_f64(jittered).unwrap_or(policy.max_delay())
}

/// The un-jittered delay: `min(base * 2^attempt, max_delay)`, saturating at the cap.
pub fn capped_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| policy.base_delay().checked_mul(factor))
        .map_or(policy.max_delay(), |d| d.min(policy.max_delay()))
}
