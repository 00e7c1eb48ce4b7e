//! Payload codec: conversions between file content and each wire format.
//!
//! - [`FileHandle`]: caller-selected content (memory or disk)
//! - [`encode_as_data_url`] / [`decode_data_url`]: base64 data URLs for the
//!   key-addressed variant, which embeds the file in a query string
//! - [`build_multipart_payload`]: one multipart part for the hash-addressed
//!   variant, no re-encoding
//! - [`extract_filename`]: best-effort Content-Disposition parsing
//! - [`trigger_download`]: hands a retrieved file to a [`DownloadSink`]
//!
//! The multipart path never touches base64, so it pays none of the ~33% size
//! overhead of the data URL path.

mod data_url;
mod disposition;
mod download;
mod file;
mod multipart;

use bytes::Bytes;
use thiserror::Error;

pub use data_url::{
    DecodedDataUrl, data_url_mime_type, decode_data_url, encode_as_data_url,
    encode_bytes_as_data_url, parse_data_url,
};
pub use disposition::{DEFAULT_FILENAME, extract_filename};
#[cfg(target_arch = "wasm32")]
pub use download::BrowserDownloadSink;
#[cfg(not(target_arch = "wasm32"))]
pub use download::DirectorySink;
pub use download::{DownloadError, DownloadSink, SavedDownload, trigger_download};
pub use file::{DEFAULT_MIME_TYPE, FileHandle};
pub use multipart::{MULTIPART_FIELD, MultipartPart, build_multipart_payload};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data URL: {reason}")]
    MalformedEncoding { reason: String },
}

impl CodecError {
    pub fn read(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            name: name.into(),
            source,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEncoding {
            reason: reason.into(),
        }
    }
}

/// One wire representation of a payload.
#[derive(Debug, Clone)]
pub enum EncodedPayload {
    Raw(Bytes),
    DataUrl(String),
    MultipartPart(MultipartPart),
}

impl EncodedPayload {
    /// MIME type carried by the representation itself, if any.
    pub fn mime_type(&self) -> Option<String> {
        match self {
            Self::Raw(_) => None,
            Self::DataUrl(data_url) => data_url_mime_type(data_url),
            Self::MultipartPart(part) => Some(part.mime_type().to_string()),
        }
    }

    /// Recovers the original bytes by applying the inverse transform.
    pub async fn into_bytes(self) -> Result<Bytes, CodecError> {
        match self {
            Self::Raw(bytes) => Ok(bytes),
            Self::DataUrl(data_url) => decode_data_url(&data_url).map(Bytes::from),
            Self::MultipartPart(part) => part.file().read().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_representation_decodes_to_the_original_bytes() {
        let original = Bytes::from_static(b"\x00\xffbinary\r\n");
        let file = FileHandle::from_bytes("x.bin", "", original.clone());

        let data_url = EncodedPayload::DataUrl(encode_as_data_url(&file).await.unwrap());
        assert_eq!(data_url.into_bytes().await.unwrap(), original);

        let part = EncodedPayload::MultipartPart(build_multipart_payload(&file));
        assert_eq!(part.into_bytes().await.unwrap(), original);

        assert_eq!(
            EncodedPayload::Raw(original.clone()).into_bytes().await.unwrap(),
            original
        );
    }

    #[test]
    fn mime_type_comes_from_the_representation() {
        let file = FileHandle::from_bytes("a.png", "image/png", vec![1u8]);
        assert_eq!(EncodedPayload::Raw(Bytes::new()).mime_type(), None);
        assert_eq!(
            EncodedPayload::DataUrl("data:image/gif;base64,AA==".into()).mime_type().as_deref(),
            Some("image/gif")
        );
        assert_eq!(
            EncodedPayload::MultipartPart(build_multipart_payload(&file)).mime_type().as_deref(),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn malformed_data_url_payload_fails_to_decode() {
        let err = EncodedPayload::DataUrl("no separator".into())
            .into_bytes()
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));
    }
}
