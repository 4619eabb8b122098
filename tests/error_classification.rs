//! Tests for error classification logic

use resilient_api::client::error_classification::{is_retryable, is_retryable_status, Outcome};
use resilient_api::client::error_mapping::map_error_response;
use resilient_api::StandardErrorCode;

#[test]
fn test_retryable_statuses() {
    // Throttling and transient server failures
    let retryable = vec![429, 500, 502, 503, 504, 507, 529, 599];

    for status in retryable {
        assert!(
            is_retryable_status(status),
            "Status {} should be retryable",
            status
        );
    }
}

#[test]
fn test_non_retryable_statuses() {
    // Client errors fail fast; so do redirects and informational codes
    let non_retryable = vec![100, 200, 204, 301, 302, 304, 400, 401, 403, 404, 409, 413, 422];

    for status in non_retryable {
        assert!(
            !is_retryable_status(status),
            "Status {} should NOT be retryable",
            status
        );
    }
}

#[test]
fn test_transport_outcome_is_retryable() {
    assert!(is_retryable(&Outcome::Transport));
    assert!(is_retryable(&Outcome::Status(503)));
    assert!(!is_retryable(&Outcome::Status(401)));
}

#[test]
fn test_standard_code_names() {
    let standard = vec![
        StandardErrorCode::InvalidRequest,
        StandardErrorCode::Authentication,
        StandardErrorCode::PermissionDenied,
        StandardErrorCode::NotFound,
        StandardErrorCode::RequestTooLarge,
        StandardErrorCode::RateLimited,
        StandardErrorCode::QuotaExhausted,
        StandardErrorCode::ServerError,
        StandardErrorCode::Overloaded,
        StandardErrorCode::Timeout,
        StandardErrorCode::Conflict,
        StandardErrorCode::Cancelled,
        StandardErrorCode::Unknown,
    ];
    assert_eq!(standard.len(), 13, "Should have 13 standard error codes");

    // Every name maps back to itself, except the catch-all
    for code in standard {
        if code == StandardErrorCode::Unknown {
            continue;
        }
        assert_eq!(
            StandardErrorCode::from_provider_code(code.name()),
            Some(code),
            "name '{}' should round-trip",
            code.name()
        );
    }
}

#[test]
fn test_mapped_errors_keep_provider_details() {
    let cases = vec![
        (
            429,
            r#"{"error":{"type":"rate_limit_error","message":"Slow down"}}"#,
            StandardErrorCode::RateLimited,
            "Slow down",
        ),
        (
            529,
            r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#,
            StandardErrorCode::Overloaded,
            "Overloaded",
        ),
        (
            400,
            r#"{"error":{"code":"invalid_request","message":"max_tokens: required"}}"#,
            StandardErrorCode::InvalidRequest,
            "max_tokens: required",
        ),
        (
            404,
            "<html>not here</html>",
            StandardErrorCode::NotFound,
            "request failed with status 404",
        ),
    ];

    for (status, body, standard, message) in cases {
        let err = map_error_response(status, body.as_bytes(), Some("req_1"));
        assert_eq!(err.status, status);
        assert_eq!(err.standard_code, standard, "status {}", status);
        assert_eq!(err.message, message, "status {}", status);
        assert_eq!(err.request_id, "req_1");
        assert!(!err.code.is_empty(), "code must never be empty");
    }
}

#[test]
fn test_unregistered_status_gets_placeholder_code() {
    let err = map_error_response(599, b"", None);
    assert_eq!(err.code, "Unknown Status");
    assert_eq!(err.request_id, "");
    assert_eq!(err.standard_code, StandardErrorCode::Unknown);
}
