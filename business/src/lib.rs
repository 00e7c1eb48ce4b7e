//! Browser-resident client for a minimal blob store.
//!
//! [`StoreRetrieveClient`] uploads a file and returns the identifier the
//! backend files it under, and fetches a file back by that identifier. The
//! [`codec`] module holds the conversions between file content and each wire
//! format, and [`http`] the transport seam the client talks through.

mod client;
pub mod codec;
mod config;
mod diagnostics;
mod error;
pub mod http;
mod protocol;
mod test_utils;
mod tests;

pub use client::StoreRetrieveClient;
pub use codec::{
    CodecError, DownloadError, DownloadSink, EncodedPayload, FileHandle, SavedDownload,
};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MAX_QUERY_BYTES};
pub use diagnostics::{Diagnostics, LogDiagnostics};
pub use error::{ClientError, FailureKind, TransportError, ValidationError};
pub use http::{HttpTransport, Transport};
pub use protocol::{
    Identifier, Operation, ProtocolVariant, RetrieveResult, RetrievedFile, StoreInput,
    StoreResponse,
};

#[cfg(not(target_arch = "wasm32"))]
pub use codec::DirectorySink;

#[cfg(target_arch = "wasm32")]
pub use codec::BrowserDownloadSink;
