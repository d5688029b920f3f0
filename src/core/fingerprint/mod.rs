//! # Fingerprint Module
//!
//! Content digests used to recognise byte-identical files.
//!
//! The digest is SHA-256 over the full file contents; its encoded form is
//! lowercase hex. Two records with equal digests are duplicates (see
//! [`same_content`](crate::core::record::same_content)).

use crate::core::record::{ContentDigest, FileRecord};
use sha2::{Digest, Sha256};

/// Compute the content digest of `bytes`.
pub fn hash(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Encode a digest as lowercase hex.
pub fn encode(digest: &ContentDigest) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Fingerprint stage: set `content_digest` and `encoded_digest`.
///
/// Digests are set once; a record that already carries one is left alone.
/// Records without loaded content pass through unchanged.
pub fn fingerprint(mut record: FileRecord) -> FileRecord {
    if record.content_digest.is_none() {
        if let Some(content) = record.content.as_deref() {
            record.content_digest = Some(hash(content));
        }
    }

    if record.encoded_digest.is_none() {
        record.encoded_digest = record.content_digest.as_ref().map(encode);
    }

    record
}
