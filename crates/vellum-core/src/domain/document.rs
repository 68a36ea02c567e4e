//! Metadata for documents attached to an agreement.
//!
//! File bytes live elsewhere; the store only keeps where they are and a
//! checksum to verify them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Entity, EntityKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub agreement_id: String,
    pub uploader_id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Lower-case hex SHA-256 of the file contents.
    pub checksum_sha256: String,
    /// Location of the bytes in the blob store.
    pub location: String,
}

impl Entity for DocumentRecord {
    const KIND: EntityKind = EntityKind::Document;
}

impl DocumentRecord {
    /// Describe `contents` stored at `location`.
    pub fn describe(
        agreement_id: impl Into<String>,
        uploader_id: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        contents: &[u8],
        location: impl Into<String>,
    ) -> Self {
        Self {
            agreement_id: agreement_id.into(),
            uploader_id: uploader_id.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            size_bytes: contents.len() as u64,
            checksum_sha256: checksum(contents),
            location: location.into(),
        }
    }

    /// Whether `contents` are the bytes this record describes.
    pub fn matches(&self, contents: &[u8]) -> bool {
        self.size_bytes == contents.len() as u64 && self.checksum_sha256 == checksum(contents)
    }
}

fn checksum(contents: &[u8]) -> String {
    hex::encode(Sha256::digest(contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_computes_checksum() {
        let doc = DocumentRecord::describe("a-1", "u-1", "w2.pdf", "application/pdf", b"abc", "s3://b/k");
        assert_eq!(doc.size_bytes, 3);
        assert_eq!(
            doc.checksum_sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(doc.matches(b"abc"));
        assert!(!doc.matches(b"abd"));
    }
}
