//! 请求执行逻辑：带退避、限流提示与取消的重试循环。
//!
//! Request execution logic.
//!
//! One logical call runs as `Idle → Attempting → (Success | Retrying | Failed)`,
//! where `Retrying` loops back to `Attempting` after a cancellable wait.

use crate::client::core::RequestExecutor;
use crate::client::error_classification::Outcome;
use crate::client::error_mapping::map_error_response;
use crate::client::policy::Decision;
use crate::client::types::{CallStats, CancelHandle, CancelReason};
use crate::transport::{ApiRequest, ApiResponse, TransportError};
use crate::{Error, ErrorContext, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::header::HeaderValue;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Header carrying our own correlation id on every attempt.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-client-request-id";

/// A failed physical attempt, kept until the loop decides what to do with it.
enum Failure {
    Transport(TransportError),
    Response(ApiResponse),
}

impl Failure {
    fn outcome(&self) -> Outcome {
        match self {
            Failure::Transport(_) => Outcome::Transport,
            Failure::Response(resp) => Outcome::Status(resp.status),
        }
    }
}

impl RequestExecutor {
    /// Execute `request` and also return per-call stats (attempts, waits, request ids).
    pub async fn execute_with_stats(
        &self,
        request: &ApiRequest,
        cancel: &CancelHandle,
    ) -> Result<(ApiResponse, CallStats)> {
        // Idle: a call that is already cancelled never touches the network.
        if let Some(reason) = cancel.reason() {
            return Err(cancelled(reason, 0));
        }

        let start = Instant::now();
        let mut rng = match self.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut request = request.clone();
        let client_request_id = ensure_client_request_id(&mut request);
        let mut stats = CallStats {
            client_request_id: client_request_id.clone(),
            ..Default::default()
        };

        let mut attempt: u32 = 0;
        loop {
            if let Some(rl) = &self.rate_limiter {
                if let Err(reason) = rl.acquire(cancel).await {
                    return Err(cancelled(reason, attempt));
                }
            }

            stats.attempts = attempt + 1;
            let failure = match self.attempt_once(&request, cancel).await {
                Err(reason) => return Err(cancelled(reason, attempt)),
                Ok(Ok(resp)) => {
                    stats.http_status = Some(resp.status);
                    stats.upstream_request_id = resp.request_id();
                    stats.rate_limit = Some(resp.rate_limit.clone());
                    if let Some(rl) = &self.rate_limiter {
                        rl.observe(&resp.rate_limit).await;
                    }

                    if resp.is_success() {
                        stats.duration_ms = start.elapsed().as_millis();
                        info!(
                            http_status = resp.status,
                            attempts = stats.attempts,
                            client_request_id = client_request_id.as_str(),
                            request_id = stats.upstream_request_id.as_deref().unwrap_or(""),
                            duration_ms = stats.duration_ms,
                            "request succeeded"
                        );
                        return Ok((resp, stats));
                    }
                    Failure::Response(resp)
                }
                Ok(Err(e)) => Failure::Transport(e),
            };

            let outcome = failure.outcome();
            let retry_hint = match &failure {
                Failure::Response(resp) => resp.rate_limit.retry_hint(),
                Failure::Transport(_) => None,
            };

            match self.policy.decide(&outcome, attempt, retry_hint, &mut rng) {
                Decision::Fail => {
                    let err = terminal_error(failure, attempt);
                    warn!(
                        attempts = stats.attempts,
                        http_status = err.status_code().unwrap_or(0),
                        client_request_id = client_request_id.as_str(),
                        duration_ms = start.elapsed().as_millis(),
                        error = %err,
                        "request failed"
                    );
                    return Err(err);
                }
                Decision::Retry { delay } => {
                    debug!(
                        attempt,
                        outcome = ?outcome,
                        delay_ms = delay.as_millis(),
                        server_hint = retry_hint.is_some(),
                        client_request_id = client_request_id.as_str(),
                        "retrying request"
                    );
                    // The body has already been read; drop it before sleeping.
                    drop(failure);

                    tokio::select! {
                        biased;
                        reason = cancel.cancelled() => return Err(cancelled(reason, attempt)),
                        _ = tokio::time::sleep(delay) => {}
                    }

                    stats.total_wait_ms += delay.as_millis();
                    stats.retry_count += 1;
                    attempt += 1;
                }
            }
        }
    }

    /// One physical attempt, raced against cancellation and the optional attempt timeout.
    ///
    /// `Err` means the caller's signal fired; whatever the transport produced is discarded.
    async fn attempt_once(
        &self,
        request: &ApiRequest,
        cancel: &CancelHandle,
    ) -> std::result::Result<std::result::Result<ApiResponse, TransportError>, CancelReason> {
        let exchange = async {
            let send = self.transport.send(request, cancel);
            match self.attempt_timeout {
                Some(limit) => tokio::time::timeout(limit, send)
                    .await
                    .unwrap_or(Err(TransportError::Timeout(limit))),
                None => send.await,
            }
        };

        let result = tokio::select! {
            biased;
            reason = cancel.cancelled() => return Err(reason),
            result = exchange => result,
        };

        // A result that raced a cancellation still loses.
        match cancel.reason() {
            Some(reason) => Err(reason),
            None => Ok(result),
        }
    }
}

/// Use the caller's client request id if set, otherwise stamp a fresh one.
fn ensure_client_request_id(request: &mut ApiRequest) -> String {
    if let Some(existing) = request
        .headers
        .get(CLIENT_REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
    {
        return existing.to_string();
    }

    let id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers.insert(CLIENT_REQUEST_ID_HEADER, value);
    }
    id
}

fn cancelled(reason: CancelReason, attempt: u32) -> Error {
    Error::cancelled(
        reason,
        ErrorContext::new().with_source("execute").with_attempt(attempt),
    )
}

/// Surface the last observed failure, never a generic "retries exhausted".
fn terminal_error(failure: Failure, attempt: u32) -> Error {
    match failure {
        Failure::Transport(e) => Error::transport(
            e,
            ErrorContext::new().with_source("execute").with_attempt(attempt),
        ),
        Failure::Response(resp) => {
            let request_id = resp.request_id();
            let api = map_error_response(resp.status, &resp.body, request_id.as_deref());
            Error::from_api(api, resp.rate_limit)
        }
    }
}
