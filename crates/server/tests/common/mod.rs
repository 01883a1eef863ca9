//! Common test utilities for API testing with a mock engine.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by a real queue manager and a [`MockEngine`], so the HTTP surface
//! can be exercised without ffmpeg.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use remuxq_core::{testing::MockEngine, Config, QueueConfig, ServerConfig};
use remuxq_server::api::{create_router, WsBroadcaster};
use remuxq_server::state::AppState;

/// Re-export fixtures for test convenience
pub use remuxq_core::testing::fixtures;

const BOUNDARY: &str = "remuxq-test-boundary";

/// Test fixture for API testing with a mock engine.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.upload(&[("movie.mkv", b"data")]).await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state, for direct queue access
    pub state: Arc<AppState>,
    /// Mock engine - control conversions
    pub engine: MockEngine,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response with raw body and headers (for downloads)
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Load the engine before returning the fixture
    pub start_engine: bool,
    /// Make engine initialization fail with this reason
    pub init_failure: Option<String>,
    pub queue: QueueConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            start_engine: true,
            init_failure: None,
            queue: QueueConfig::default(),
        }
    }
}

impl TestConfig {
    /// Create config with the engine left loading.
    pub fn loading() -> Self {
        Self {
            start_engine: false,
            ..Default::default()
        }
    }

    /// Create config whose engine fails to load.
    pub fn failing_engine(reason: &str) -> Self {
        Self {
            init_failure: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with a ready engine.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let engine = MockEngine::new();
        if let Some(reason) = &test_config.init_failure {
            engine.set_init_failure(reason.clone()).await;
        }

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            queue: test_config.queue.clone(),
            ..Default::default()
        };

        let state = Arc::new(AppState::new(
            config,
            Arc::new(engine.clone()),
            WsBroadcaster::default(),
        ));

        if test_config.start_engine {
            let _ = state.queue().start().await;
        }

        let router = create_router(Arc::clone(&state));

        Self {
            router,
            state,
            engine,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path).await
    }

    /// Send a GET request and keep the raw body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send_raw(request).await
    }

    /// Upload files as one multipart request to `/api/v1/jobs`.
    pub async fn upload(&self, files: &[(&str, &[u8])]) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(files)))
            .unwrap();

        let raw = self.send_raw(request).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.body),
        }
    }

    /// Upload one file and return its job id.
    pub async fn upload_one(&self, name: &str, bytes: &[u8]) -> String {
        let response = self.upload(&[(name, bytes)]).await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "{}", response.body);
        response.body["results"][0]["job_id"]
            .as_str()
            .expect("file should be accepted")
            .to_string()
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        let path = format!("/api/v1/jobs/{}", job_id);
        let poll = async {
            loop {
                let response = self.get(&path).await;
                let status = response.body["status"].as_str().unwrap_or_default();
                if status == "completed" || status == "failed" {
                    return response.body;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), poll)
            .await
            .expect("job did not settle in time")
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let raw = self.send_raw(request).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.body),
        }
    }

    async fn send_raw(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            headers,
            body,
        }
    }
}

fn parse_json(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Encode files as a `multipart/form-data` body, one `files` part each.
pub fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
