//! Download side effect for retrieved files.
//!
//! A [`DownloadSink`] materializes bytes somewhere the user can reach them.
//! Each sink holds its temporary resources in guards so they are released on
//! every path, including failures halfway through.
//!
//! # Platform Support
//!
//! - **Native**: [`DirectorySink`] writes into a directory through a
//!   `.part` file that is renamed into place.
//! - **Web (WASM)**: `BrowserDownloadSink` clicks a temporary `<a download>`
//!   pointing at an object URL.

use thiserror::Error;

use super::DEFAULT_FILENAME;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("download unavailable: {0}")]
    Unavailable(String),
}

impl DownloadError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Where a download ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDownload {
    pub filename: String,
    /// Filesystem path or object URL, depending on the sink.
    pub location: String,
    pub size: usize,
}

/// Trait for materializing a downloaded file, enabling test doubles.
pub trait DownloadSink: Send + Sync {
    fn save(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<SavedDownload, DownloadError>;
}

pub fn trigger_download(
    sink: &dyn DownloadSink,
    bytes: &[u8],
    filename: &str,
    mime_type: &str,
) -> Result<SavedDownload, DownloadError> {
    let filename = safe_filename(filename);
    log::debug!(
        target: "blobdrop::download",
        "saving {} ({} bytes, {})",
        filename,
        bytes.len(),
        mime_type
    );
    sink.save(bytes, &filename, mime_type)
}

/// Reduces a server-suggested name to a bare file name.
fn safe_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match name {
        "" | "." | ".." => DEFAULT_FILENAME.to_string(),
        name => name.to_string(),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::DirectorySink;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::{DownloadError, DownloadSink, SavedDownload};

    /// Saves downloads into a directory.
    #[derive(Debug, Clone)]
    pub struct DirectorySink {
        dir: PathBuf,
    }

    impl DirectorySink {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }
    }

    impl DownloadSink for DirectorySink {
        fn save(
            &self,
            bytes: &[u8],
            filename: &str,
            _mime_type: &str,
        ) -> Result<SavedDownload, DownloadError> {
            let target = self.dir.join(filename);
            let partial = PartialFile::new(self.dir.join(format!(".{filename}.part")));

            fs::write(partial.path(), bytes)
                .map_err(|e| DownloadError::io(partial.path().display().to_string(), e))?;
            partial.persist(&target)?;

            Ok(SavedDownload {
                filename: filename.to_string(),
                location: target.display().to_string(),
                size: bytes.len(),
            })
        }
    }

    /// A temporary file that is deleted on drop unless persisted.
    struct PartialFile {
        path: PathBuf,
        persisted: bool,
    }

    impl PartialFile {
        fn new(path: PathBuf) -> Self {
            Self {
                path,
                persisted: false,
            }
        }

        fn path(&self) -> &Path {
            &self.path
        }

        fn persist(mut self, target: &Path) -> Result<(), DownloadError> {
            fs::rename(&self.path, target)
                .map_err(|e| DownloadError::io(target.display().to_string(), e))?;
            self.persisted = true;
            Ok(())
        }
    }

    impl Drop for PartialFile {
        fn drop(&mut self) {
            if !self.persisted && self.path.exists() {
                if let Err(e) = fs::remove_file(&self.path) {
                    log::warn!(
                        target: "blobdrop::download",
                        "failed to remove partial download {}: {}",
                        self.path.display(),
                        e
                    );
                }
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserDownloadSink;

#[cfg(target_arch = "wasm32")]
mod browser {
    use wasm_bindgen::{JsCast as _, JsValue};
    use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, HtmlElement, Url};

    use super::{DownloadError, DownloadSink, SavedDownload};

    /// Triggers a browser download through a temporary anchor element.
    #[derive(Debug, Default)]
    pub struct BrowserDownloadSink;

    impl DownloadSink for BrowserDownloadSink {
        fn save(
            &self,
            bytes: &[u8],
            filename: &str,
            mime_type: &str,
        ) -> Result<SavedDownload, DownloadError> {
            let window = web_sys::window()
                .ok_or_else(|| DownloadError::Unavailable("no window".to_string()))?;
            let document = window
                .document()
                .ok_or_else(|| DownloadError::Unavailable("no document".to_string()))?;
            let body = document
                .body()
                .ok_or_else(|| DownloadError::Unavailable("no document body".to_string()))?;

            let parts = web_sys::js_sys::Array::new();
            parts.push(&web_sys::js_sys::Uint8Array::from(bytes));
            let options = BlobPropertyBag::new();
            options.set_type(mime_type);
            let blob =
                Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(js_error)?;

            let object_url = ObjectUrl::create(&blob)?;

            let anchor: HtmlAnchorElement = document
                .create_element("a")
                .map_err(js_error)?
                .dyn_into()
                .map_err(|_| DownloadError::Unavailable("anchor element".to_string()))?;
            anchor.set_href(object_url.as_str());
            anchor.set_download(filename);

            let attached = AttachedAnchor::attach(body, anchor)?;
            attached.anchor.click();

            Ok(SavedDownload {
                filename: filename.to_string(),
                location: object_url.as_str().to_string(),
                size: bytes.len(),
            })
        }
    }

    /// Object URL revoked on drop.
    struct ObjectUrl(String);

    impl ObjectUrl {
        fn create(blob: &Blob) -> Result<Self, DownloadError> {
            Url::create_object_url_with_blob(blob)
                .map(Self)
                .map_err(js_error)
        }

        fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl Drop for ObjectUrl {
        fn drop(&mut self) {
            if let Err(e) = Url::revoke_object_url(&self.0) {
                log::warn!(target: "blobdrop::download", "failed to revoke object URL: {e:?}");
            }
        }
    }

    /// Anchor element removed from its parent on drop.
    struct AttachedAnchor {
        parent: HtmlElement,
        anchor: HtmlAnchorElement,
    }

    impl AttachedAnchor {
        fn attach(parent: HtmlElement, anchor: HtmlAnchorElement) -> Result<Self, DownloadError> {
            parent.append_child(&anchor).map_err(js_error)?;
            Ok(Self { parent, anchor })
        }
    }

    impl Drop for AttachedAnchor {
        fn drop(&mut self) {
            let _ = self.parent.remove_child(&self.anchor);
        }
    }

    fn js_error(value: JsValue) -> DownloadError {
        DownloadError::Unavailable(format!("{value:?}"))
    }
}
