//! Uploaded images awaiting ingestion.

use crate::pipeline::naming;

/// Raw image bytes plus the name they were uploaded under.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Vec<u8>>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
        }
    }

    /// MIME type sent to the extraction service, guessed from the name.
    pub fn mime_type(&self) -> String {
        naming::guess_mime_type(&self.file_name)
    }

    /// Reason this upload cannot be processed, if any.
    pub fn validate(&self) -> Option<&'static str> {
        match (self.bytes.is_empty(), self.file_name.trim().is_empty()) {
            (true, true) => Some("Image data and original file name are missing."),
            (true, false) => Some("Image data is missing."),
            (false, true) => Some("Original file name is missing."),
            (false, false) => None,
        }
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(ImageUpload::new(vec![1, 2, 3], "card.jpg").validate().is_none());
        assert!(ImageUpload::new(Vec::new(), "card.jpg").validate().is_some());
        assert!(ImageUpload::new(vec![1], "  ").validate().is_some());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let upload = ImageUpload::new(vec![0u8; 2048], "card.png");
        let debug = format!("{:?}", upload);
        assert!(debug.contains("card.png"));
        assert!(debug.contains("2048"));
    }
}
