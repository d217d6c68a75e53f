//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock detection service injected, enabling E2E testing of the
//! dashboard API without a running detector.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tower::ServiceExt;

use lookout_core::{testing::MockDetector, Config, Severity};
use lookout_server::{AppState, WsMessage};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use lookout_core::testing::fixtures;

const BOUNDARY: &str = "lookout-test-boundary";

/// Test fixture for E2E testing with a mock detection service.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_enroll() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture
///         .post_multipart("/api/v1/faces/enroll", &[Part::text("name", "alice")])
///         .await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Mock detection service - script enrollment results, inspect calls
    pub detector: Arc<MockDetector>,
    /// Temporary directory standing in for the dashboard build
    _temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub bytes: Vec<u8>,
}

/// One part of a multipart request.
pub enum Part {
    Text {
        name: &'static str,
        value: String,
    },
    File {
        name: &'static str,
        file_name: String,
        content_type: &'static str,
        data: Vec<u8>,
    },
}

#[allow(dead_code)]
impl Part {
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Part::Text {
            name,
            value: value.into(),
        }
    }

    pub fn jpeg(file_name: &str, size: usize) -> Self {
        Part::File {
            name: "files",
            file_name: file_name.to_string(),
            content_type: "image/jpeg",
            data: vec![0xFF; size],
        }
    }

    pub fn file(
        name: &'static str,
        file_name: &str,
        content_type: &'static str,
        data: Vec<u8>,
    ) -> Self {
        Part::File {
            name,
            file_name: file_name.to_string(),
            content_type,
            data,
        }
    }
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with a default mock detector.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("index.html"), "<html>lookout</html>")
            .expect("Failed to write index.html");

        let detector = Arc::new(MockDetector::new());

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.server.dashboard_dir = temp_dir.path().to_path_buf();

        let state = Arc::new(AppState::with_detector(config, Arc::clone(&detector)));
        let router = lookout_server::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            detector,
            _temp_dir: temp_dir,
        }
    }

    /// Create a fixture whose detector reports an accelerator, with the
    /// orchestrator cache already refreshed.
    pub async fn accelerated() -> Self {
        let fixture = Self::new().await;
        fixture.detector.set_accelerator(true);
        fixture
            .state
            .orchestrator()
            .refresh_acceleration()
            .await
            .expect("mock detector is online");
        fixture
    }

    /// Subscribe to the WebSocket broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.state.ws_broadcaster().subscribe()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a multipart/form-data POST.
    pub async fn post_multipart(&self, path: &str, parts: &[Part]) -> TestResponse {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, file_name, content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            body,
            bytes: body_bytes.to_vec(),
        }
    }

    /// Wait until no batch is running.
    pub async fn wait_until_idle(&self) {
        let orchestrator = Arc::clone(self.state.orchestrator());
        wait_for(move || !orchestrator.is_active()).await;
    }

    /// Wait until a batch is parked on the fallback decision.
    pub async fn wait_for_decision(&self) -> lookout_core::DecisionPrompt {
        let state = Arc::clone(&self.state);
        wait_for(move || state.decisions().pending().is_some()).await;
        self.state
            .decisions()
            .pending()
            .expect("decision should be pending")
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_for(condition: impl Fn() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not reached in time");
}

/// Receive broadcast messages until the next operator notification.
#[allow(dead_code)]
pub async fn next_notification(
    rx: &mut broadcast::Receiver<WsMessage>,
) -> (Severity, String) {
    let received = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(WsMessage::Notification { severity, message }) => return (severity, message),
                Ok(_) => continue,
                Err(e) => panic!("broadcast closed: {}", e),
            }
        }
    })
    .await;
    received.expect("no notification in time")
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

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
