//! Caller-selected file content.

use bytes::Bytes;

use super::CodecError;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Where the bytes of a [`FileHandle`] live.
#[derive(Debug, Clone)]
enum FileSource {
    Memory(Bytes),
    #[cfg(not(target_arch = "wasm32"))]
    Path(std::path::PathBuf),
}

/// An immutable reference to user-selected binary content plus its display
/// name and MIME type.
///
/// Name, MIME type and source are fixed at selection. Cloning is cheap:
/// in-memory content is reference counted and a path-backed handle holds the
/// path, so the file must stay unchanged until the operation using it ends.
#[derive(Debug, Clone)]
pub struct FileHandle {
    name: String,
    mime_type: String,
    source: FileSource,
}

impl FileHandle {
    /// Wraps content that is already in memory, e.g. bytes handed over by a
    /// browser file input.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            name: name.into(),
            mime_type: if mime_type.trim().is_empty() {
                DEFAULT_MIME_TYPE.to_string()
            } else {
                mime_type
            },
            source: FileSource::Memory(bytes.into()),
        }
    }

    /// References a file on disk. The MIME type is guessed from the
    /// extension; the content is read when an operation consumes the handle.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: impl Into<std::path::PathBuf>) -> Result<Self, CodecError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CodecError::read(
                    path.display().to_string(),
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self {
            name,
            mime_type,
            source: FileSource::Path(path),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The file on disk backing this handle, if any.
    #[cfg(not(target_arch = "wasm32"))]
    pub(crate) fn path(&self) -> Option<&std::path::Path> {
        match &self.source {
            FileSource::Memory(_) => None,
            FileSource::Path(path) => Some(path),
        }
    }

    /// Reads the whole content.
    ///
    /// In-memory content is returned without copying.
    pub async fn read(&self) -> Result<Bytes, CodecError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            #[cfg(not(target_arch = "wasm32"))]
            FileSource::Path(path) => {
                log::trace!(target: "blobdrop::codec", "reading {}", path.display());
                tokio::fs::read(path)
                    .await
                    .map(Bytes::from)
                    .map_err(|source| CodecError::read(self.name.clone(), source))
            }
        }
    }
}
