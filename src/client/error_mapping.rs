//! Turn a failed response into an [`ApiError`].

use crate::error::ApiError;
use crate::error_code::StandardErrorCode;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

/// Classify a non-success response. Never fails.
///
/// Reads `{"error": {"code", "message", "type"}}`; any missing or empty field
/// falls back on its own: `code` to the status reason phrase, `message` to
/// `"request failed with status <status>"`.
pub fn map_error_response(status: u16, body: &[u8], request_id: Option<&str>) -> ApiError {
    let parsed = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .unwrap_or_default();

    let provider_code = non_empty(parsed.code);
    let error_type = non_empty(parsed.error_type);

    let standard_code = provider_code
        .as_deref()
        .and_then(StandardErrorCode::from_provider_code)
        .or_else(|| error_type.as_deref().and_then(StandardErrorCode::from_provider_code))
        .unwrap_or_else(|| StandardErrorCode::from_http_status(status));

    ApiError {
        status,
        code: provider_code.unwrap_or_else(|| reason_phrase(status).to_string()),
        message: non_empty(parsed.message)
            .unwrap_or_else(|| format!("request failed with status {}", status)),
        request_id: request_id.unwrap_or_default().to_string(),
        error_type,
        standard_code,
    }
}

/// Canonical reason phrase, or `"Unknown Status"` for unregistered codes.
pub fn reason_phrase(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
