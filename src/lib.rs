//! # resilient-api
//!
//! 面向限流与瞬时故障的 JSON/HTTP API 请求执行核心。
//!
//! Resilient request-execution core for JSON/HTTP APIs that enforce rate limits
//! and fail transiently.
//!
//! ## Overview
//!
//! Every outbound call goes through a [`RequestExecutor`], which decides after
//! each physical attempt whether the call succeeded, should be retried, or has
//! failed for good:
//!
//! - **Backoff**: exponential, capped, with ±20% jitter ([`client::backoff`])
//! - **Classification**: transport failures, 429 and 5xx retry; 4xx do not
//!   ([`client::error_classification`])
//! - **Server hints**: `Retry-After` on a 429 replaces computed backoff
//!   ([`client::rate_limit`])
//! - **Typed errors**: failed responses become [`ApiError`]; throttling is its own
//!   variant carrying the [`RateLimitSnapshot`] ([`client::error_mapping`])
//! - **Cancellation**: a [`CancelHandle`] (token + optional deadline) pre-empts both
//!   in-flight attempts and inter-attempt waits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resilient_api::{ApiRequest, CancelHandle, RequestExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> resilient_api::Result<()> {
//!     let executor = RequestExecutor::builder()
//!         .policy(RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(60))?)
//!         .build()?;
//!
//!     let request = ApiRequest::post("https://api.example.com/v1/messages")?
//!         .with_json(&serde_json::json!({"model": "example-1", "max_tokens": 64}))?;
//!     let cancel = CancelHandle::new().with_timeout(Duration::from_secs(120));
//!
//!     match executor.execute(&request, &cancel).await {
//!         Ok(resp) => println!("{}", resp.text()),
//!         Err(e) if e.is_rate_limited() => eprintln!("throttled: {:?}", e.rate_limit()),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Executor, retry policy, backoff, classification, error mapping |
//! | [`transport`] | Request/response descriptors and the `reqwest` transport |
//! | [`resilience`] | Optional header-driven client-side throttling |
//! | [`error_code`] | Stable error categories |

pub mod client;
pub mod error_code;
pub mod resilience;
pub mod transport;

// Re-export main types for convenience
pub use client::{
    CallStats, CancelHandle, CancelReason, RateLimitSnapshot, RequestExecutor,
    RequestExecutorBuilder, RetryPolicy,
};
pub use error_code::StandardErrorCode;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{ApiError, Error, ErrorContext};
