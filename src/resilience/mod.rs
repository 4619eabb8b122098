//! 弹性模块：基于服务端限流头的自适应节流。
//!
//! # Resilience Primitives Module
//!
//! Opt-in client-side throttling that complements the executor's retry loop.
//! Retries react to failures after the fact; the limiter uses the rate-limit
//! headers of earlier responses to hold back requests that would be throttled.
//!
//! ```rust
//! use resilient_api::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//!
//! // 5 requests per second, bursts of up to 10
//! let config = RateLimiterConfig::from_rps(5.0).unwrap().with_burst(10);
//! let limiter = RateLimiter::new(config);
//! ```

pub mod rate_limiter;
