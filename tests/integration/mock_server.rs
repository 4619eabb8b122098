//! Mock HTTP server setup for integration tests

use mockito::{Matcher, Mock, Server, ServerGuard};
use resilient_api::{HttpTransport, RequestExecutor, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const TEST_API_KEY: &str = "test-key";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Executor over a real `reqwest` transport with short backoff so retries stay fast.
    pub fn create_test_executor(&self, max_retries: u32) -> RequestExecutor {
        let transport = HttpTransport::from_client(reqwest::Client::new()).with_api_key(TEST_API_KEY);
        RequestExecutor::builder()
            .transport(transport)
            .policy(
                RetryPolicy::new(
                    max_retries,
                    Duration::from_millis(10),
                    Duration::from_millis(50),
                )
                .expect("valid policy"),
            )
            .jitter_seed(1)
            .build()
            .expect("executor")
    }

    /// Create a mock for a successful JSON response
    pub async fn mock_json_response(
        &self,
        path: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Mock {
        let mut server = self.server.lock().await;
        let mut mock = server
            .mock("POST", path)
            .match_header("authorization", format!("Bearer {}", TEST_API_KEY).as_str())
            .match_header("x-client-request-id", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json");
        for (name, value) in headers {
            mock = mock.with_header(*name, value);
        }
        mock.with_body(body).expect(1).create_async().await
    }

    /// Create a mock for an error response, expected exactly `hits` times
    pub async fn mock_error_response(
        &self,
        path: &str,
        status: usize,
        error_body: &str,
        headers: &[(&str, &str)],
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        let mut mock = server
            .mock("POST", path)
            .with_status(status)
            .with_header("content-type", "application/json");
        for (name, value) in headers {
            mock = mock.with_header(*name, value);
        }
        mock.with_body(error_body).expect(hits).create_async().await
    }
}
