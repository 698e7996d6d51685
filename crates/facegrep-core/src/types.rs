//! Core data types for images moving through intake, matching and display.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Image payload: the raw bytes and their base64 rendition.
///
/// The base64 form is what classifier requests carry. It is derived exactly
/// once, when the payload is built at intake, and reused for every request
/// the owning record participates in.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageData {
    bytes: Vec<u8>,
    base64: String,
}

impl ImageData {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let base64 = BASE64.encode(&bytes);
        Self { bytes, base64 }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }
}

/// One user-selected image: where it came from, what it is, and its payload.
///
/// Records clone cheaply (the payload is shared) and carry no identity of
/// their own; position within a selection is the only identity the rest of
/// the system relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    path: PathBuf,
    mime: &'static str,
    data: Arc<ImageData>,
}

impl ImageRecord {
    pub fn new(path: impl Into<PathBuf>, mime: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            mime,
            data: Arc::new(ImageData::from_bytes(bytes)),
        }
    }

    /// Path the record was selected from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// MIME type sniffed at intake, e.g. `image/jpeg`.
    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.bytes()
    }

    pub fn base64(&self) -> &str {
        self.data.base64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_derived_at_construction() {
        let data = ImageData::from_bytes(b"hello".to_vec());
        assert_eq!(data.base64(), "aGVsbG8=");
        assert_eq!(data.bytes(), b"hello");
    }

    #[test]
    fn test_base64_is_standard_padded() {
        // 0xFF 0xD8 is a JPEG magic prefix; standard alphabet encodes it as "/9g="
        let data = ImageData::from_bytes(vec![0xFF, 0xD8]);
        assert_eq!(data.base64(), "/9g=");
    }

    #[test]
    fn test_record_clone_shares_payload() {
        let record = ImageRecord::new("a.png", "image/png", vec![1, 2, 3]);
        let clone = record.clone();
        assert_eq!(record, clone);
        // Same allocation behind both clones.
        assert!(std::ptr::eq(record.bytes(), clone.bytes()));
    }

    #[test]
    fn test_record_accessors() {
        let record = ImageRecord::new("photos/b.jpg", "image/jpeg", vec![9]);
        assert_eq!(record.path(), Path::new("photos/b.jpg"));
        assert_eq!(record.mime(), "image/jpeg");
        assert_eq!(record.base64(), "CQ==");
    }
}
