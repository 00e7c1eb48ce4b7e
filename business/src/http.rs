//! Platform-abstracted HTTP exchange with Send-safe futures.
//!
//! The client never calls the network directly; it hands a [`Request`] to an
//! injected [`Transport`]. [`HttpTransport`] is the production implementation
//! over `reqwest`, and tests substitute their own transports.
//!
//! On WASM, `reqwest::Response` is not `Send` because it contains JS types
//! (`JsValue`, `JsFuture`, etc.) that are inherently single-threaded. To keep
//! the client's futures `Send` on every target:
//! - On **native**: reqwest is used directly (futures are Send)
//! - On **WASM**: the request is spawned on the JS thread using
//!   `wasm_bindgen_futures::spawn_local`, and the result comes back through a
//!   `flume` channel (which is Send-safe)

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::codec::{CodecError, FileHandle, MultipartPart};

/// HTTP method for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Request body.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    /// A single-part multipart form. The part's file is read at send time,
    /// streamed from disk for path-backed handles.
    Multipart(MultipartPart),
}

/// A fully described request, ready to hand to a [`Transport`].
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// URL without the query string.
    pub url: String,
    /// Query parameters, in order, not yet percent-encoded.
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl Request {
    /// URL with the query parameters form-urlencoded onto it.
    pub fn full_url(&self) -> HttpResult<String> {
        let mut url = url::Url::parse(&self.url)
            .map_err(|e| HttpError::network(format!("invalid URL {}: {e}", self.url)))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url.into())
    }

    /// Looks up a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A simplified HTTP response that contains only Send-safe data.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercased keys)
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Returns true if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .and_then(|value| value.split(';').next())
            .map(|media| media.trim().to_ascii_lowercase())
            .filter(|media| !media.is_empty())
    }

    /// Attempt to deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client error.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The exchange itself failed: connection, TLS, invalid URL, aborted body.
    #[error("HTTP error: {0}")]
    Network(String),
    /// The request body could not be produced.
    #[error(transparent)]
    Body(#[from] CodecError),
}

impl HttpError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Capability to perform one HTTP exchange.
///
/// Injected into the client so tests can replace the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> HttpResult<Response>;
}

/// A builder for constructing HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            request: Request {
                method,
                url: url.into(),
                query: Vec::new(),
                body: Body::Empty,
            },
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.query.push((name.into(), value.into()));
        self
    }

    /// Set the request body to a multipart form with a single part.
    pub fn multipart(mut self, part: MultipartPart) -> Self {
        self.request.body = Body::Multipart(part);
        self
    }

    pub fn build(self) -> Request {
        self.request
    }

    /// Send the request through the given transport.
    pub async fn send(self, transport: &dyn Transport) -> HttpResult<Response> {
        transport.send(self.request).await
    }
}

/// Entry points for building requests.
///
/// # Example
///
/// ```ignore
/// use blobdrop_business::http::{Client, HttpTransport};
///
/// async fn fetch(transport: &HttpTransport) {
///     let response = Client::get("http://localhost:8000/retrieve/")
///         .query("hash", "abc123")
///         .send(transport)
///         .await
///         .unwrap();
///
///     if response.is_success() {
///         let filename = response.header("Content-Disposition");
///     }
/// }
/// ```
pub struct Client;

impl Client {
    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Get, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Post, url)
    }
}

/// [`Transport`] over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    #[cfg(not(target_arch = "wasm32"))]
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> HttpResult<Response> {
        log::debug!(
            target: "blobdrop::http",
            "{:?} {} ({} query params)",
            request.method,
            request.url,
            request.query.len()
        );

        #[cfg(not(target_arch = "wasm32"))]
        {
            execute(&self.client, request).await
        }

        #[cfg(target_arch = "wasm32")]
        {
            send_wasm(request).await
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn send_wasm(request: Request) -> HttpResult<Response> {
    // flume channels are Send-safe, so this future is Send
    let (tx, rx) = flume::bounded::<HttpResult<Response>>(1);

    // This closure is NOT Send, but spawn_local doesn't require Send
    wasm_bindgen_futures::spawn_local(async move {
        let client = reqwest::Client::new();
        let result = execute(&client, request).await;
        // Ignore send errors if the receiver was dropped
        let _ = tx.send_async(result).await;
    });

    rx.recv_async()
        .await
        .map_err(|_| HttpError::network("Request cancelled"))?
}

async fn execute(client: &reqwest::Client, request: Request) -> HttpResult<Response> {
    let url = request.full_url()?;

    let builder = match request.method {
        Method::Get => client.get(&url),
        Method::Post => client.post(&url),
    };

    let builder = match request.body {
        Body::Empty => builder,
        Body::Multipart(part) => builder.multipart(multipart_form(&part).await?),
    };

    let response = builder
        .send()
        .await
        .map_err(|e| HttpError::network(e.to_string()))?;

    // Extract status and headers before consuming the response
    let status = response.status().as_u16();
    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), v.to_string());
        }
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| HttpError::network(e.to_string()))?
        .to_vec();

    log::trace!(
        target: "blobdrop::http",
        "{} -> {} ({} bytes)",
        request.url,
        status,
        body.len()
    );

    Ok(Response {
        status,
        headers,
        body,
    })
}

async fn multipart_form(part: &MultipartPart) -> HttpResult<reqwest::multipart::Form> {
    let file_part = match streamed_part(part.file()).await? {
        Some(file_part) => file_part,
        None => reqwest::multipart::Part::bytes(part.file().read().await?.to_vec()),
    }
    .file_name(part.filename().to_string());

    // An unparsable MIME type is dropped rather than failing the upload.
    let file_part = if part.mime_type().parse::<mime_guess::mime::Mime>().is_ok() {
        file_part
            .mime_str(part.mime_type())
            .map_err(|e| HttpError::network(e.to_string()))?
    } else {
        log::debug!(
            target: "blobdrop::http",
            "sending {} without a content type: {:?} is not a MIME type",
            part.filename(),
            part.mime_type()
        );
        file_part
    };

    Ok(reqwest::multipart::Form::new().part(part.field_name().to_string(), file_part))
}

/// Opens a path-backed handle as a body stream sized from the file metadata.
#[cfg(not(target_arch = "wasm32"))]
async fn streamed_part(file: &FileHandle) -> HttpResult<Option<reqwest::multipart::Part>> {
    let Some(path) = file.path() else {
        return Ok(None);
    };

    let opened = tokio::fs::File::open(path)
        .await
        .map_err(|source| CodecError::read(file.name(), source))?;
    let length = opened
        .metadata()
        .await
        .map_err(|source| CodecError::read(file.name(), source))?
        .len();
    let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(opened));

    Ok(Some(reqwest::multipart::Part::stream_with_length(body, length)))
}

#[cfg(target_arch = "wasm32")]
async fn streamed_part(_file: &FileHandle) -> HttpResult<Option<reqwest::multipart::Part>> {
    Ok(None)
}
