use super::{ApiRequest, ApiResponse, Transport, TransportError};
use crate::client::types::CancelHandle;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Proxy;
use std::env;
use std::time::Duration;

/// `reqwest`-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // Minimal production-friendly defaults (env-overridable).
        let timeout_secs = env::var("RESILIENT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(
                env::var("RESILIENT_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("RESILIENT_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )));

        if let Ok(proxy_url) = env::var("RESILIENT_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(|e| {
            crate::Error::transport(
                TransportError::Http(e),
                crate::ErrorContext::new().with_source("http_transport_init"),
            )
        })?;

        Ok(Self {
            client,
            api_key: env::var("RESILIENT_API_KEY").ok().filter(|k| !k.is_empty()),
        })
    }

    /// Wrap an already configured client (custom TLS, connectors, test servers).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` unless the request sets its own header.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        cancel: &CancelHandle,
    ) -> std::result::Result<ApiResponse, TransportError> {
        let exchange = async {
            let mut req = self
                .client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone());

            if let Some(key) = &self.api_key {
                if !request.headers.contains_key(AUTHORIZATION) {
                    req = req.bearer_auth(key);
                }
            }
            if let Some(body) = &request.body {
                req = req.body(body.clone());
            }

            let resp = req.send().await?;
            let status = resp.status().as_u16();
            let headers = resp.headers().clone();
            // Read to completion so the connection goes back to the pool now.
            let body = resp.bytes().await?;
            Ok::<_, TransportError>(ApiResponse::new(status, headers, body))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = exchange => result,
        }
    }
}
