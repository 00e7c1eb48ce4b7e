use std::fmt;

use thiserror::Error;

use crate::codec::{CodecError, DownloadError};
use crate::http::HttpError;
use crate::protocol::{Operation, ProtocolVariant};

/// Input problems caught before any request is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no file selected")]
    MissingFile,
    #[error("no identifier provided")]
    MissingIdentifier,
    #[error("a key is required by the {0} protocol")]
    MissingKey(ProtocolVariant),
    #[error("identifier is for the {got} protocol but the client speaks {expected}")]
    VariantMismatch {
        expected: ProtocolVariant,
        got: ProtocolVariant,
    },
    #[error("request URL is {len} bytes, over the {limit} byte limit")]
    QueryTooLong { len: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("{0} is already in flight")]
    Busy(Operation),
    #[error("{0} was cancelled")]
    Cancelled(Operation),
}

impl From<HttpError> for ClientError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Network(message) => Self::Transport(TransportError::Network(message)),
            HttpError::Body(codec) => Self::Codec(codec),
        }
    }
}

/// Failure taxonomy used when reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    Transport,
    MalformedResponse,
    Read,
    MalformedEncoding,
    Download,
    Busy,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::MalformedResponse => "malformed-response",
            Self::Read => "read",
            Self::MalformedEncoding => "malformed-encoding",
            Self::Download => "download",
            Self::Busy => "busy",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

impl ClientError {
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::Transport(_) => FailureKind::Transport,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::Codec(CodecError::Read { .. }) => FailureKind::Read,
            Self::Codec(CodecError::MalformedEncoding { .. }) => FailureKind::MalformedEncoding,
            Self::Download(_) => FailureKind::Download,
            Self::Busy(_) => FailureKind::Busy,
            Self::Cancelled(_) => FailureKind::Cancelled,
        }
    }

    /// HTTP status of a rejected request, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
