use super::FileHandle;

/// Form field the store endpoint expects the file under.
pub const MULTIPART_FIELD: &str = "file";

/// One named part of a multipart form body.
///
/// The part only references its [`FileHandle`]; the transport reads the
/// content when the request goes out.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    field_name: String,
    file: FileHandle,
}

impl MultipartPart {
    pub fn new(field_name: impl Into<String>, file: FileHandle) -> Self {
        Self {
            field_name: field_name.into(),
            file,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn filename(&self) -> &str {
        self.file.name()
    }

    pub fn mime_type(&self) -> &str {
        self.file.mime_type()
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }
}

pub fn build_multipart_payload(file: &FileHandle) -> MultipartPart {
    MultipartPart::new(MULTIPART_FIELD, file.clone())
}
