//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use blobdrop_business::http::{Body, HttpResult, Method, Request, Response, Transport};
use blobdrop_business::{ClientConfig, ProtocolVariant, StoreRetrieveClient};
use tokio::sync::Notify;

pub const BASE_URL: &str = "http://backend.test";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn client_for(
    variant: ProtocolVariant,
    transport: Arc<dyn Transport>,
) -> Arc<StoreRetrieveClient> {
    init_logger();
    Arc::new(StoreRetrieveClient::new(
        ClientConfig::new(BASE_URL, variant),
        transport,
    ))
}

fn reply(status: u16, headers: &[(&str, String)], body: Vec<u8>) -> Response {
    Response {
        status,
        headers: headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
        body,
    }
}

fn json_reply(status: u16, body: serde_json::Value) -> Response {
    reply(
        status,
        &[("content-type", "application/json".to_string())],
        body.to_string().into_bytes(),
    )
}

#[derive(Debug, Clone)]
struct StoredBlob {
    filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

/// Backend that speaks both protocol variants from memory.
///
/// Hash-addressed blobs come back raw with a Content-Disposition header;
/// key-addressed blobs come back as `{"file": <data URL>}`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    by_hash: Mutex<HashMap<String, StoredBlob>>,
    by_key: Mutex<HashMap<String, String>>,
    requests: Mutex<usize>,
}

impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_count(&self) -> usize {
        *self.requests.lock().unwrap()
    }

    async fn store_multipart(&self, request: &Request) -> Response {
        let Body::Multipart(part) = &request.body else {
            return json_reply(422, serde_json::json!({ "detail": "expected a file" }));
        };
        let bytes = part.file().read().await.unwrap().to_vec();

        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        let hash = format!("{:016x}", hasher.finish());

        self.by_hash.lock().unwrap().insert(
            hash.clone(),
            StoredBlob {
                filename: part.filename().to_string(),
                mime_type: part.mime_type().to_string(),
                bytes,
            },
        );
        json_reply(200, serde_json::json!({ "hash": hash }))
    }

    fn store_query(&self, request: &Request) -> Response {
        let (Some(key), Some(data)) = (request.query_param("key"), request.query_param("data"))
        else {
            return json_reply(422, serde_json::json!({ "detail": "missing key or data" }));
        };
        let data: serde_json::Value = serde_json::from_str(data).unwrap();
        let file = data["file"].as_str().unwrap().to_string();
        self.by_key.lock().unwrap().insert(key.to_string(), file);
        reply(200, &[], Vec::new())
    }

    fn retrieve(&self, request: &Request) -> Response {
        if let Some(hash) = request.query_param("hash") {
            return match self.by_hash.lock().unwrap().get(hash) {
                Some(blob) => reply(
                    200,
                    &[
                        ("content-type", blob.mime_type.clone()),
                        (
                            "content-disposition",
                            format!("attachment; filename=\"{}\"", blob.filename),
                        ),
                    ],
                    blob.bytes.clone(),
                ),
                None => json_reply(404, serde_json::json!({ "detail": "File not found" })),
            };
        }
        if let Some(key) = request.query_param("key") {
            let file = self.by_key.lock().unwrap().get(key).cloned();
            return json_reply(200, serde_json::json!({ "file": file }));
        }
        json_reply(422, serde_json::json!({ "detail": "missing identifier" }))
    }
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn send(&self, request: Request) -> HttpResult<Response> {
        *self.requests.lock().unwrap() += 1;
        let route = request.url.trim_start_matches(BASE_URL);
        let response = match (request.method, route) {
            (Method::Post, "/store/") => self.store_multipart(&request).await,
            (Method::Get, "/store/") => self.store_query(&request),
            (Method::Get, "/retrieve/") => self.retrieve(&request),
            _ => json_reply(405, serde_json::json!({ "detail": "Method Not Allowed" })),
        };
        Ok(response)
    }
}

/// Transport that parks every request until released, so tests can observe
/// an operation while it is in flight.
#[derive(Debug, Default)]
pub struct ParkedTransport {
    pub entered: Notify,
    pub release: Notify,
}

impl ParkedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Transport for ParkedTransport {
    async fn send(&self, request: Request) -> HttpResult<Response> {
        self.entered.notify_one();
        self.release.notified().await;

        Ok(match request.method {
            Method::Post => json_reply(200, serde_json::json!({ "hash": "parked" })),
            Method::Get => reply(200, &[], b"parked".to_vec()),
        })
    }
}
