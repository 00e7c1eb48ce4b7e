//! Wire-level vocabulary shared by the client and its callers.

use std::fmt;

use bytes::Bytes;
use serde::Deserialize;

use crate::codec::FileHandle;

/// Request encoding spoken by the backend.
///
/// The two variants are mutually incompatible: identifiers issued by one are
/// meaningless to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ProtocolVariant {
    /// `POST /store/` with a multipart body; retrieval by server-issued hash
    /// returns the raw file.
    #[default]
    #[serde(rename = "multipart")]
    Multipart,
    /// `GET /store/?key=..&data=<json>` with the file embedded as a data URL;
    /// retrieval by key returns `{"file": <data URL>}`.
    #[serde(rename = "data-url-query")]
    DataUrlQuery,
}

impl ProtocolVariant {
    /// Query parameter naming the identifier on `/retrieve/`.
    pub fn identifier_param(&self) -> &'static str {
        match self {
            Self::Multipart => "hash",
            Self::DataUrlQuery => "key",
        }
    }

    /// Builds the identifier kind this variant accepts from raw user input.
    pub fn identifier(&self, raw: impl Into<String>) -> Identifier {
        match self {
            Self::Multipart => Identifier::Hash(raw.into()),
            Self::DataUrlQuery => Identifier::Key(raw.into()),
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multipart => write!(f, "multipart"),
            Self::DataUrlQuery => write!(f, "data-url-query"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Client-chosen lookup token.
    Key(String),
    /// Content-derived identifier issued by the server on store.
    Hash(String),
}

impl Identifier {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Key(value) | Self::Hash(value) => value,
        }
    }

    pub fn variant(&self) -> ProtocolVariant {
        match self {
            Self::Key(_) => ProtocolVariant::DataUrlQuery,
            Self::Hash(_) => ProtocolVariant::Multipart,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key:{key}"),
            Self::Hash(hash) => write!(f, "hash:{hash}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Store,
    Retrieve,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Retrieve => "retrieve",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs collected for a store operation.
#[derive(Default, Debug, Clone)]
pub struct StoreInput {
    pub file: Option<FileHandle>,
    /// Lookup key; required by [`ProtocolVariant::DataUrlQuery`].
    pub key: Option<String>,
    /// Free-form `data` field sent alongside the file by the key-addressed
    /// variant. Defaults to the file name.
    pub data: Option<String>,
}

impl StoreInput {
    pub fn file(file: FileHandle) -> Self {
        Self {
            file: Some(file),
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Server acknowledgement of a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub identifier: Identifier,
    /// Body as returned by the server, kept for display.
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveResult {
    Found(RetrievedFile),
    NotFound,
}

impl RetrieveResult {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn into_file(self) -> Option<RetrievedFile> {
        match self {
            Self::Found(file) => Some(file),
            Self::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_builds_its_own_identifier_kind() {
        assert_eq!(
            ProtocolVariant::Multipart.identifier("abc123"),
            Identifier::Hash("abc123".into())
        );
        assert_eq!(
            ProtocolVariant::DataUrlQuery.identifier("k"),
            Identifier::Key("k".into())
        );
    }

    #[test]
    fn identifier_reports_its_variant() {
        assert_eq!(Identifier::Hash("h".into()).variant(), ProtocolVariant::Multipart);
        assert_eq!(Identifier::Key("k".into()).variant(), ProtocolVariant::DataUrlQuery);
        assert!(Identifier::Key("  ".into()).is_blank());
    }

    #[test]
    fn variant_deserializes_from_config_names() {
        let variant: ProtocolVariant = serde_json::from_str(r#""data-url-query""#).unwrap();
        assert_eq!(variant, ProtocolVariant::DataUrlQuery);
        assert_eq!(variant.to_string(), "data-url-query");
        assert_eq!(ProtocolVariant::default(), ProtocolVariant::Multipart);
    }

    #[test]
    fn store_input_builder() {
        let input = StoreInput::file(FileHandle::from_bytes("a", "", Vec::new()))
            .with_key("k")
            .with_data("note");
        assert_eq!(input.key.as_deref(), Some("k"));
        assert_eq!(input.data.as_deref(), Some("note"));
        assert!(StoreInput::default().file.is_none());
    }
}
