use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::{CodecError, FileHandle, file::DEFAULT_MIME_TYPE};

/// A data URL split into its declared MIME type and decoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    /// MIME type from the `data:<mime>;base64` prefix, if one was declared.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Reads the file and encodes it as `data:<mime>;base64,<payload>`.
pub async fn encode_as_data_url(file: &FileHandle) -> Result<String, CodecError> {
    let bytes = file.read().await?;
    let data_url = encode_bytes_as_data_url(file.mime_type(), &bytes);
    log::trace!(
        target: "blobdrop::codec",
        "encoded {} ({} bytes) as data URL of {} chars",
        file.name(),
        bytes.len(),
        data_url.len()
    );
    Ok(data_url)
}

pub fn encode_bytes_as_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = if mime_type.trim().is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        mime_type
    };
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Decodes the payload of a data URL, discarding the prefix up to the first
/// comma.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, CodecError> {
    parse_data_url(data_url).map(|decoded| decoded.bytes)
}

pub fn parse_data_url(data_url: &str) -> Result<DecodedDataUrl, CodecError> {
    let (prefix, payload) = data_url
        .split_once(',')
        .ok_or_else(|| CodecError::malformed("missing ',' separator"))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| CodecError::malformed(format!("invalid base64 payload: {e}")))?;

    Ok(DecodedDataUrl {
        mime_type: prefix_mime_type(prefix),
        bytes,
    })
}

/// MIME type declared in the prefix, without decoding the payload.
pub fn data_url_mime_type(data_url: &str) -> Option<String> {
    data_url
        .split_once(',')
        .and_then(|(prefix, _)| prefix_mime_type(prefix))
}

fn prefix_mime_type(prefix: &str) -> Option<String> {
    prefix
        .trim()
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|mime| !mime.is_empty())
        .map(str::to_string)
}
