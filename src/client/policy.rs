use crate::client::backoff::backoff_delay;
use crate::client::error_classification::{is_retryable, Outcome};
use crate::{Error, ErrorContext, Result};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// How to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Bounded retry budget with exponential backoff.
///
/// Immutable after construction; share it behind an `Arc` across concurrent calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Validates `base_delay > 0` and `max_delay >= base_delay`.
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Result<Self> {
        if base_delay.is_zero() {
            return Err(Error::configuration_with_context(
                "base delay must be greater than zero",
                ErrorContext::new()
                    .with_field_path("policy.base_delay")
                    .with_source("retry_policy"),
            ));
        }
        if max_delay < base_delay {
            return Err(Error::configuration_with_context(
                "max delay must not be smaller than base delay",
                ErrorContext::new()
                    .with_field_path("policy.max_delay")
                    .with_details(format!(
                        "base={}ms max={}ms",
                        base_delay.as_millis(),
                        max_delay.as_millis()
                    ))
                    .with_source("retry_policy"),
            ));
        }
        Ok(Self {
            max_retries,
            base_delay,
            max_delay,
        })
    }

    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Defaults overridden by env:
    /// - `RESILIENT_MAX_RETRIES`
    /// - `RESILIENT_MIN_DELAY_MS`
    /// - `RESILIENT_MAX_DELAY_MS`
    ///
    /// Unparseable values are rejected rather than silently replaced.
    pub fn from_env() -> Result<Self> {
        let config = RetryPolicyConfig {
            max_retries: env_i64("RESILIENT_MAX_RETRIES")?,
            min_delay_ms: env_i64("RESILIENT_MIN_DELAY_MS")?,
            max_delay_ms: env_i64("RESILIENT_MAX_DELAY_MS")?,
        };
        Self::try_from(config)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Decide what to do after attempt `attempt` (0-based) ended with `outcome`.
    ///
    /// A positive `retry_hint` on a 429 is used verbatim in place of computed backoff.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        outcome: &Outcome,
        attempt: u32,
        retry_hint: Option<Duration>,
        rng: &mut R,
    ) -> Decision {
        if !is_retryable(outcome) || attempt >= self.max_retries {
            return Decision::Fail;
        }

        let delay = match (outcome, retry_hint) {
            (Outcome::Status(429), Some(hint)) if !hint.is_zero() => hint,
            _ => backoff_delay(self, attempt, rng),
        };
        Decision::Retry { delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Serialized form of [`RetryPolicy`] (millisecond integers). Missing fields take defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryPolicyConfig {
    pub max_retries: Option<i64>,
    pub min_delay_ms: Option<i64>,
    pub max_delay_ms: Option<i64>,
}

impl TryFrom<RetryPolicyConfig> for RetryPolicy {
    type Error = Error;

    fn try_from(config: RetryPolicyConfig) -> Result<Self> {
        let max_retries = non_negative(config.max_retries, "policy.max_retries")?
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let base_delay = non_negative(config.min_delay_ms, "policy.min_delay_ms")?
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(DEFAULT_BASE_DELAY);
        // An explicit base above the default cap lifts the cap with it.
        let max_delay = non_negative(config.max_delay_ms, "policy.max_delay_ms")?
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or_else(|| DEFAULT_MAX_DELAY.max(base_delay));
        RetryPolicy::new(max_retries, base_delay, max_delay)
    }
}

fn non_negative(value: Option<i64>, field: &str) -> Result<Option<i64>> {
    match value {
        Some(v) if v < 0 => Err(Error::configuration_with_context(
            format!("{} must not be negative", field),
            ErrorContext::new()
                .with_field_path(field)
                .with_details(format!("got {}", v))
                .with_source("retry_policy"),
        )),
        other => Ok(other),
    }
}

fn env_i64(name: &str) -> Result<Option<i64>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<i64>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                format!("{} is not an integer", name),
                ErrorContext::new()
                    .with_field_path(name)
                    .with_details(raw.clone())
                    .with_source("retry_policy_env"),
            )
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_zero_base_delay() {
        let err = RetryPolicy::new(3, Duration::ZERO, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(
            err.context().unwrap().field_path.as_deref(),
            Some("policy.base_delay")
        );
    }

    #[test]
    fn test_rejects_cap_below_base() {
        let err = RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("max delay"));
    }

    #[test]
    fn test_config_negative_retry_count_fails_fast() {
        let config: RetryPolicyConfig =
            serde_json::from_str(r#"{"max_retries": -1}"#).unwrap();
        let err = RetryPolicy::try_from(config).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config: RetryPolicyConfig =
            serde_json::from_str(r#"{"max_retries": 5, "min_delay_ms": 200}"#).unwrap();
        let policy = RetryPolicy::try_from(config).unwrap();
        assert_eq!(policy.max_retries(), 5);
        assert_eq!(policy.base_delay(), Duration::from_millis(200));
        assert_eq!(policy.max_delay(), DEFAULT_MAX_DELAY);

        let empty = RetryPolicy::try_from(RetryPolicyConfig::default()).unwrap();
        assert_eq!(empty, RetryPolicy::default());
    }

    #[test]
    fn test_decide_respects_budget() {
        let policy = RetryPolicy::new(2, Duration::from_millis(100), Duration::from_secs(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = Outcome::Status(503);
        assert!(matches!(
            policy.decide(&outcome, 0, None, &mut rng),
            Decision::Retry { .. }
        ));
        assert!(matches!(
            policy.decide(&outcome, 1, None, &mut rng),
            Decision::Retry { .. }
        ));
        assert_eq!(policy.decide(&outcome, 2, None, &mut rng), Decision::Fail);
    }

    #[test]
    fn test_decide_non_retryable_fails_immediately() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            policy.decide(&Outcome::Status(401), 0, None, &mut rng),
            Decision::Fail
        );
    }

    #[test]
    fn test_retry_after_overrides_backoff_only_for_429() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(3);
        let hint = Some(Duration::from_secs(2));
        assert_eq!(
            policy.decide(&Outcome::Status(429), 0, hint, &mut rng),
            Decision::Retry {
                delay: Duration::from_secs(2)
            }
        );
        // The hint is used verbatim, even above the backoff cap.
        assert_eq!(
            policy.decide(&Outcome::Status(429), 0, Some(Duration::from_secs(90)), &mut rng),
            Decision::Retry {
                delay: Duration::from_secs(90)
            }
        );
        match policy.decide(&Outcome::Status(503), 0, hint, &mut rng) {
            Decision::Retry { delay } => {
                assert!(delay >= Duration::from_millis(800) && delay <= Duration::from_millis(1200))
            }
            Decision::Fail => panic!("503 should retry"),
        }
    }
}
