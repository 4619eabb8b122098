use crate::client::rate_limit::RateLimitSnapshot;
use crate::client::types::CancelReason;
use crate::error_code::StandardErrorCode;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "policy.max_delay")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Operation that produced the error (e.g., "execute", "retry_wait")
    pub source: Option<String>,
    /// 0-based attempt index the error was observed on, if any
    pub attempt: Option<u32>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }
}

/// A failed response, classified.
///
/// `status` is 0 when no response was received. `code` is always non-empty:
/// either the provider's machine code or the HTTP reason phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
    /// Upstream correlation id; empty if the response carried none.
    pub request_id: String,
    /// Provider error `type` field, when present.
    pub error_type: Option<String>,
    pub standard_code: StandardErrorCode,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} ({}): {}", self.status, self.code, self.message)?;
        if !self.request_id.is_empty() {
            write!(f, " [request_id: {}]", self.request_id)?;
        }
        Ok(())
    }
}

/// Unified error type for the request execution core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {source}{}", format_context(.context))]
    Transport {
        source: TransportError,
        context: ErrorContext,
    },

    #[error("API error: {0}")]
    Api(ApiError),

    #[error("Rate limited: {error}{}", format_retry_after(.rate_limit))]
    RateLimited {
        error: ApiError,
        rate_limit: RateLimitSnapshot,
    },

    #[error("Request cancelled: {reason}{}", format_context(.context))]
    Cancelled {
        reason: CancelReason,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if let Some(attempt) = ctx.attempt {
        parts.push(format!("attempt: {}", attempt));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_retry_after(snapshot: &RateLimitSnapshot) -> String {
    if snapshot.retry_after.is_zero() {
        String::new()
    } else {
        format!(" (retry after {}s)", snapshot.retry_after.as_secs())
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub(crate) fn transport(source: TransportError, context: ErrorContext) -> Self {
        Error::Transport { source, context }
    }

    pub(crate) fn cancelled(reason: CancelReason, context: ErrorContext) -> Self {
        Error::Cancelled { reason, context }
    }

    /// Build the terminal error for a classified failure. 429 always becomes
    /// [`Error::RateLimited`] so callers can branch on it.
    pub(crate) fn from_api(error: ApiError, rate_limit: RateLimitSnapshot) -> Self {
        if error.status == 429 {
            Error::RateLimited { error, rate_limit }
        } else {
            Error::Api(error)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Whether the failure would have been retried had budget remained.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } | Error::RateLimited { .. } => true,
            Error::Api(e) => crate::client::error_classification::is_retryable_status(e.status),
            _ => false,
        }
    }

    /// HTTP status of the classified failure, or `None` when no response was received.
    pub fn status_code(&self) -> Option<u16> {
        self.api_error().map(|e| e.status)
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) | Error::RateLimited { error: e, .. } => Some(e),
            _ => None,
        }
    }

    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        match self {
            Error::RateLimited { rate_limit, .. } => Some(rate_limit),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Transport { context, .. }
            | Error::Cancelled { context, .. } => Some(context),
            _ => None,
        }
    }
}
