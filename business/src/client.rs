//! The store/retrieve client.
//!
//! [`StoreRetrieveClient`] drives one Store and one Retrieve at a time against
//! a blob backend, speaking whichever [`ProtocolVariant`] the configuration
//! selects. Each operation:
//!
//! 1. validates its input before touching any shared state
//! 2. enters its [`BusyGate`], rejecting a second submission with
//!    [`ClientError::Busy`]
//! 3. runs encode → send → decode, racing the gate's cancellation token
//! 4. reports the outcome to the injected [`Diagnostics`] and returns it
//!
//! The gate is released by the guard's drop on every path.

use std::sync::Arc;

use blobdrop_states::{BusyGate, GateGuard, any_busy};
use bytes::Bytes;
use log::{debug, info};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::codec::{
    self, DEFAULT_FILENAME, DEFAULT_MIME_TYPE, DownloadSink, EncodedPayload, FileHandle,
    SavedDownload,
};
use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostics, LogDiagnostics};
use crate::error::{ClientError, TransportError, ValidationError};
use crate::http::{Client, HttpTransport, Request, Response, Transport};
use crate::protocol::{
    Identifier, Operation, ProtocolVariant, RetrieveResult, RetrievedFile, StoreInput,
    StoreResponse,
};

/// Longest slice of an error body kept in a [`TransportError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

pub struct StoreRetrieveClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
    store_gate: BusyGate,
    retrieve_gate: BusyGate,
}

impl std::fmt::Debug for StoreRetrieveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRetrieveClient")
            .field("config", &self.config)
            .field("diagnostics", &self.diagnostics)
            .field("store", &self.store_gate.status())
            .field("retrieve", &self.retrieve_gate.status())
            .finish_non_exhaustive()
    }
}

impl StoreRetrieveClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            diagnostics: Arc::new(LogDiagnostics),
            store_gate: BusyGate::new("store"),
            retrieve_gate: BusyGate::new("retrieve"),
        }
    }

    /// Client over the real network.
    pub fn with_http(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.config.variant()
    }

    pub fn is_storing(&self) -> bool {
        self.store_gate.is_busy()
    }

    pub fn is_retrieving(&self) -> bool {
        self.retrieve_gate.is_busy()
    }

    /// True while either operation is in flight.
    pub fn is_busy(&self) -> bool {
        any_busy(&[&self.store_gate, &self.retrieve_gate])
    }

    pub fn can_store(&self) -> bool {
        !self.is_storing()
    }

    pub fn can_retrieve(&self) -> bool {
        !self.is_retrieving()
    }

    /// Cancels the in-flight instance of `operation`. Returns false when
    /// nothing was running.
    pub fn cancel(&self, operation: Operation) -> bool {
        let cancelled = self.gate(operation).cancel();
        if cancelled {
            info!(target: "blobdrop::client", "Cancelling in-flight {operation}");
        }
        cancelled
    }

    /// Uploads a file and returns the identifier it can be retrieved by.
    pub async fn store(&self, input: StoreInput) -> Result<StoreResponse, ClientError> {
        let result = self.run_store(input).await;
        self.report(Operation::Store, &result);
        result
    }

    /// Looks up a file by identifier. A missing file is
    /// [`RetrieveResult::NotFound`], not an error.
    pub async fn retrieve(&self, identifier: &Identifier) -> Result<RetrieveResult, ClientError> {
        let result = self.run_retrieve(identifier).await;
        self.report(Operation::Retrieve, &result);
        result
    }

    /// Retrieves a file and hands it to `sink`. The sink is only invoked when
    /// the file was found; `Ok(None)` means there was nothing to save.
    ///
    /// The outcome is reported once, as a Retrieve, after the sink has run.
    pub async fn download(
        &self,
        identifier: &Identifier,
        sink: &dyn DownloadSink,
    ) -> Result<Option<SavedDownload>, ClientError> {
        let result = self.run_download(identifier, sink).await;
        self.report(Operation::Retrieve, &result);
        result
    }

    async fn run_download(
        &self,
        identifier: &Identifier,
        sink: &dyn DownloadSink,
    ) -> Result<Option<SavedDownload>, ClientError> {
        let file = match self.run_retrieve(identifier).await? {
            RetrieveResult::Found(file) => file,
            RetrieveResult::NotFound => {
                info!(target: "blobdrop::client", "Nothing to download for {identifier}");
                return Ok(None);
            }
        };

        let saved = codec::trigger_download(sink, &file.bytes, &file.filename, &file.mime_type)?;
        Ok(Some(saved))
    }

    async fn run_store(&self, input: StoreInput) -> Result<StoreResponse, ClientError> {
        let StoreInput { file, key, data } = input;
        let file = file.ok_or(ValidationError::MissingFile)?;
        let variant = self.variant();

        let key = match variant {
            ProtocolVariant::Multipart => {
                if key.is_some() {
                    debug!(target: "blobdrop::client", "Ignoring key, the multipart protocol issues its own hash");
                }
                None
            }
            ProtocolVariant::DataUrlQuery => Some(
                key.filter(|k| !k.trim().is_empty())
                    .ok_or(ValidationError::MissingKey(variant))?,
            ),
        };

        let guard = self.enter(Operation::Store)?;
        info!(
            target: "blobdrop::client",
            "Storing {} ({}) via {variant}",
            file.name(),
            file.mime_type()
        );

        cancellable(
            guard.cancellation_token(),
            Operation::Store,
            self.store_exchange(variant, &file, key.as_deref(), data),
        )
        .await
    }

    async fn store_exchange(
        &self,
        variant: ProtocolVariant,
        file: &FileHandle,
        key: Option<&str>,
        data: Option<String>,
    ) -> Result<StoreResponse, ClientError> {
        let url = self.config.store_url();
        let request = match variant {
            ProtocolVariant::Multipart => Client::post(url)
                .multipart(codec::build_multipart_payload(file))
                .build(),
            ProtocolVariant::DataUrlQuery => {
                let key = key.ok_or(ValidationError::MissingKey(variant))?;
                let data_url = codec::encode_as_data_url(file).await?;
                let data = data.unwrap_or_else(|| file.name().to_string());
                self.query_store_request(url, key, &data, &data_url)?
            }
        };

        let response = self.transport.send(request).await?;
        ensure_success(&response)?;
        let body = store_body(&response)?;
        let identifier = store_identifier(variant, &body, key)?;

        info!(target: "blobdrop::client", "Stored {} as {identifier}", file.name());
        Ok(StoreResponse { identifier, body })
    }

    /// `GET /store/?key=..&data=..`, refused locally when the URL would be
    /// longer than the configured limit.
    fn query_store_request(
        &self,
        url: String,
        key: &str,
        data: &str,
        data_url: &str,
    ) -> Result<Request, ClientError> {
        let embedded = json!({ "key": key, "data": data, "file": data_url }).to_string();
        let request = Client::get(url)
            .query("key", key)
            .query("data", embedded)
            .build();

        let len = request.full_url()?.len();
        let limit = self.config.max_query_bytes();
        if len > limit {
            return Err(ValidationError::QueryTooLong { len, limit }.into());
        }
        debug!(target: "blobdrop::client", "Store request URL is {len} bytes");
        Ok(request)
    }

    async fn run_retrieve(&self, identifier: &Identifier) -> Result<RetrieveResult, ClientError> {
        if identifier.is_blank() {
            return Err(ValidationError::MissingIdentifier.into());
        }
        let variant = self.variant();
        if identifier.variant() != variant {
            return Err(ValidationError::VariantMismatch {
                expected: variant,
                got: identifier.variant(),
            }
            .into());
        }

        let guard = self.enter(Operation::Retrieve)?;
        info!(target: "blobdrop::client", "Retrieving {identifier}");

        cancellable(
            guard.cancellation_token(),
            Operation::Retrieve,
            self.retrieve_exchange(variant, identifier),
        )
        .await
    }

    async fn retrieve_exchange(
        &self,
        variant: ProtocolVariant,
        identifier: &Identifier,
    ) -> Result<RetrieveResult, ClientError> {
        let response = Client::get(self.config.retrieve_url())
            .query(variant.identifier_param(), identifier.as_str())
            .send(self.transport.as_ref())
            .await?;

        if response.status == 404 {
            info!(target: "blobdrop::client", "{identifier} not found");
            return Ok(RetrieveResult::NotFound);
        }
        ensure_success(&response)?;

        let result = decode_retrieved(variant, response).await?;
        if let RetrieveResult::Found(file) = &result {
            info!(
                target: "blobdrop::client",
                "Retrieved {} ({} bytes, {})",
                file.filename,
                file.bytes.len(),
                file.mime_type
            );
        }
        Ok(result)
    }

    fn gate(&self, operation: Operation) -> &BusyGate {
        match operation {
            Operation::Store => &self.store_gate,
            Operation::Retrieve => &self.retrieve_gate,
        }
    }

    fn enter(&self, operation: Operation) -> Result<GateGuard, ClientError> {
        self.gate(operation)
            .try_enter()
            .map_err(|_| ClientError::Busy(operation))
    }

    fn report<T>(&self, operation: Operation, result: &Result<T, ClientError>) {
        match result {
            Ok(_) => self.diagnostics.succeeded(operation),
            Err(e) => self.diagnostics.failed(operation, e),
        }
    }
}

/// Runs `work` until it finishes or `token` is cancelled.
async fn cancellable<T>(
    token: CancellationToken,
    operation: Operation,
    work: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ClientError::Cancelled(operation)),
        result = work => result,
    }
}

fn ensure_success(response: &Response) -> Result<(), ClientError> {
    if response.is_success() {
        return Ok(());
    }
    let body: String = String::from_utf8_lossy(&response.body)
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    Err(TransportError::Status {
        status: response.status,
        body,
    }
    .into())
}

/// Store responses may legitimately be empty; that reads as JSON `null`.
fn store_body(response: &Response) -> Result<Value, ClientError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    response
        .json()
        .map_err(|e| ClientError::malformed_response(format!("store response is not JSON: {e}")))
}

fn store_identifier(
    variant: ProtocolVariant,
    body: &Value,
    submitted_key: Option<&str>,
) -> Result<Identifier, ClientError> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
    };

    match variant {
        ProtocolVariant::Multipart => field("hash")
            .map(Identifier::Hash)
            .ok_or_else(|| ClientError::malformed_response("store response has no hash")),
        ProtocolVariant::DataUrlQuery => field("key")
            .or_else(|| submitted_key.map(str::to_string))
            .map(Identifier::Key)
            .ok_or(ValidationError::MissingKey(variant).into()),
    }
}

fn declares_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|media| media == "application/json" || media.ends_with("+json"))
}

/// Hash lookups always answer with the stored bytes themselves, whatever
/// their media type, so only key lookups are read as a `{"file": ..}`
/// envelope.
async fn decode_retrieved(
    variant: ProtocolVariant,
    response: Response,
) -> Result<RetrieveResult, ClientError> {
    let content_type = response.content_type();

    if variant == ProtocolVariant::DataUrlQuery {
        if declares_json(content_type.as_deref()) {
            let body: Value = response.json().map_err(|e| {
                ClientError::malformed_response(format!(
                    "retrieve response is not valid JSON: {e}"
                ))
            })?;
            return decode_json_body(&body).await;
        }

        if content_type.is_none() {
            let envelope = response
                .json::<Value>()
                .ok()
                .filter(|body| body.get("file").is_some());
            if let Some(body) = envelope {
                debug!(target: "blobdrop::client", "Undeclared body looks like a JSON file envelope");
                return decode_json_body(&body).await;
            }
        }
    }

    let filename = codec::extract_filename(response.header("content-disposition"));
    let mime_type = content_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    let bytes = EncodedPayload::Raw(Bytes::from(response.body)).into_bytes().await?;

    Ok(RetrieveResult::Found(RetrievedFile {
        filename,
        mime_type,
        bytes,
    }))
}

async fn decode_json_body(body: &Value) -> Result<RetrieveResult, ClientError> {
    let data_url = match body.get("file") {
        None | Some(Value::Null) => return Ok(RetrieveResult::NotFound),
        Some(Value::String(data_url)) => data_url.clone(),
        Some(other) => {
            return Err(ClientError::malformed_response(format!(
                "`file` should be a data URL string, got {other}"
            )));
        }
    };

    let filename = body
        .get("filename")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string();

    let payload = EncodedPayload::DataUrl(data_url);
    let mime_type = payload
        .mime_type()
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    let bytes = payload.into_bytes().await?;

    Ok(RetrieveResult::Found(RetrievedFile {
        filename,
        mime_type,
        bytes,
    }))
}
