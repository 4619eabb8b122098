//! Request execution client.
//!
//! Keep the public surface small and predictable: build a [`RequestExecutor`],
//! hand it an [`crate::transport::ApiRequest`] and a [`CancelHandle`].
//! The retry building blocks (backoff, classification, rate-limit extraction,
//! error mapping) are public for callers composing their own loops.

pub mod backoff;
pub mod builder;
pub mod core;
pub mod error_classification;
pub mod error_mapping;
mod execution;
pub mod policy;
pub mod rate_limit;
pub mod types;

pub use builder::RequestExecutorBuilder;
pub use self::core::RequestExecutor;
pub use execution::CLIENT_REQUEST_ID_HEADER;
pub use policy::{Decision, RetryPolicy, RetryPolicyConfig};
pub use rate_limit::RateLimitSnapshot;
pub use types::{CallStats, CancelHandle, CancelReason};
