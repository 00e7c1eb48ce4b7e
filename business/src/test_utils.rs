//! Test utilities for exercising the client without a real backend.
//!
//! Two layers are provided:
//! - [`MockTransport`]: an in-process [`Transport`] that records every request
//!   and answers from a queue of canned results
//! - [`TestContext`]: a `wiremock` server plus a client wired to it through the
//!   real [`HttpTransport`], for tests that need actual HTTP on the wire
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::TestContext;
//!
//! #[tokio::test]
//! async fn test_retrieve_by_hash() {
//!     let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
//!     test_ctx.mock_retrieve_raw("abc123", b"bytes", Some("a.bin")).await;
//!
//!     let result = test_ctx.client.retrieve(&Identifier::Hash("abc123".into())).await;
//!     // ... assert on result
//! }
//! ```

#![cfg(all(test, not(target_arch = "wasm32")))]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

use crate::client::StoreRetrieveClient;
use crate::config::ClientConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{ClientError, FailureKind};
use crate::http::{HttpError, HttpResult, HttpTransport, Request, Response, Transport};
use crate::protocol::{Operation, ProtocolVariant};

/// Builds a response with a text body and no headers.
pub fn response(status: u16, body: &str) -> Response {
    Response {
        status,
        headers: HashMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

/// Builds a response with a JSON body and a matching Content-Type.
pub fn json_response(status: u16, body: serde_json::Value) -> Response {
    response(status, &body.to_string()).with_header("Content-Type", "application/json")
}

impl Response {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }
}

/// Transport that records requests and replays queued results in order.
///
/// Once the queue is empty every request fails with a network error.
#[derive(Debug, Default)]
pub struct MockTransport {
    results: Mutex<VecDeque<HttpResult<Response>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_responses(responses: impl IntoIterator<Item = Response>) -> Arc<Self> {
        Self::with_results(responses.into_iter().map(Ok))
    }

    pub fn with_results(results: impl IntoIterator<Item = HttpResult<Response>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into_iter().collect()),
            requests: Mutex::default(),
        })
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> HttpResult<Response> {
        self.requests.lock().unwrap().push(request);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::network("no response queued")))
    }
}

/// Diagnostics sink that keeps every report for later assertions.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    failures: Mutex<Vec<(Operation, FailureKind)>>,
    successes: Mutex<Vec<Operation>>,
}

impl RecordingDiagnostics {
    pub fn failures(&self) -> Vec<(Operation, FailureKind)> {
        self.failures.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<Operation> {
        self.successes.lock().unwrap().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn failed(&self, operation: Operation, error: &ClientError) {
        self.failures.lock().unwrap().push((operation, error.kind()));
    }

    fn succeeded(&self, operation: Operation) {
        self.successes.lock().unwrap().push(operation);
    }
}

/// Test context that holds a mock server and a client pointed at it.
pub struct TestContext {
    /// The mock server instance.
    pub mock_server: MockServer,
    /// Client using the real HTTP transport against the mock server.
    pub client: StoreRetrieveClient,
    pub diagnostics: Arc<RecordingDiagnostics>,
}

impl TestContext {
    /// Create a new test context with a fresh mock server.
    pub async fn new(variant: ProtocolVariant) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let mock_server = MockServer::start().await;
        let config = ClientConfig::new(mock_server.uri(), variant);
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let client = StoreRetrieveClient::new(config, Arc::new(HttpTransport::new()))
            .with_diagnostics(diagnostics.clone());

        Self {
            mock_server,
            client,
            diagnostics,
        }
    }

    // =========================================================================
    // Mock endpoint helpers
    // =========================================================================

    /// Mock the multipart store endpoint answering with `hash`.
    pub async fn mock_store_hash(&self, hash: &str) {
        Mock::given(method("POST"))
            .and(path("/store/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "hash": hash })),
            )
            .mount(&self.mock_server)
            .await;
    }

    /// Mock the store endpoint with an error.
    pub async fn mock_store_error(&self, status: u16, body: &str) {
        Mock::given(path("/store/"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.mock_server)
            .await;
    }

    /// Mock a raw binary retrieve by hash.
    pub async fn mock_retrieve_raw(&self, hash: &str, bytes: &[u8], filename: Option<&str>) {
        let mut template = ResponseTemplate::new(200)
            .set_body_raw(bytes.to_vec(), "application/octet-stream");
        if let Some(filename) = filename {
            template = template.insert_header(
                "Content-Disposition",
                format!("attachment; filename=\"{filename}\"").as_str(),
            );
        }

        Mock::given(method("GET"))
            .and(path("/retrieve/"))
            .and(query_param("hash", hash))
            .respond_with(template)
            .mount(&self.mock_server)
            .await;
    }

    /// Mock a JSON retrieve by key.
    pub async fn mock_retrieve_json(&self, key: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/retrieve/"))
            .and(query_param("key", key))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.mock_server)
            .await;
    }

    /// Mock the retrieve endpoint answering 404 for everything.
    pub async fn mock_retrieve_missing(&self) {
        Mock::given(method("GET"))
            .and(path("/retrieve/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "not found"
            })))
            .mount(&self.mock_server)
            .await;
    }
}
