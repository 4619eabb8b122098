//! Transport layer: one request/response exchange, no retries.
//!
//! The executor owns every retry decision. A [`Transport`] performs exactly one
//! physical exchange, reads the body to completion (so the connection is released
//! before the next attempt), and aborts promptly when the [`CancelHandle`] fires.

pub mod http;

pub use http::HttpTransport;

use crate::client::rate_limit::{header_first, RateLimitSnapshot};
use crate::client::types::CancelHandle;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Response headers consulted for the upstream correlation id, in priority order.
pub const REQUEST_ID_HEADERS: &[&str] = &["request-id", "x-request-id", "x-amzn-requestid", "cf-ray"];

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single exchange. Must not retry internally.
    async fn send(
        &self,
        request: &ApiRequest,
        cancel: &CancelHandle,
    ) -> std::result::Result<ApiResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("attempt timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("exchange aborted by cancellation")]
    Cancelled,

    #[error("Transport error: {0}")]
    Other(String),
}

/// A built request descriptor.
///
/// The body is held as [`Bytes`] so every attempt hands the transport a fresh,
/// fully readable copy; nothing assumes a stream can be replayed.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: url::Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let url = url::Url::parse(url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid request URL: {}", e),
                ErrorContext::new()
                    .with_field_path("request.url")
                    .with_details(url.to_string())
                    .with_source("request_builder"),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                format!("unsupported URL scheme '{}'", url.scheme()),
                ErrorContext::new()
                    .with_field_path("request.url")
                    .with_source("request_builder"),
            ));
        }
        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    pub fn post(url: &str) -> Result<Self> {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid header name: {}", e),
                ErrorContext::new()
                    .with_field_path("request.headers")
                    .with_details(name.to_string()),
            )
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid header value: {}", e),
                ErrorContext::new().with_field_path(format!("request.headers.{}", name)),
            )
        })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the JSON body and set `content-type`.
    pub fn with_json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(payload)?;
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub rate_limit: RateLimitSnapshot,
}

impl ApiResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let rate_limit = RateLimitSnapshot::from_headers(&headers);
        Self {
            status,
            headers,
            body: body.into(),
            rate_limit,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Upstream correlation id, if the server sent one.
    pub fn request_id(&self) -> Option<String> {
        header_first(&self.headers, REQUEST_ID_HEADERS)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
