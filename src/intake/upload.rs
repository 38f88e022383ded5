use std::path::Path;

/// Raw bytes handed over by the upload collaborator, with the metadata it
/// claimed. None of the metadata is trusted beyond picking a decoder.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub declared_size: Option<u64>,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            declared_size: None,
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn with_declared_size(mut self, declared_size: u64) -> Self {
        self.declared_size = Some(declared_size);
        self
    }

    /// Lower-cased final extension of the file name.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
