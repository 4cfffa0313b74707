//! Content fingerprints for rule files
//!
//! A fingerprint is the SHA-256 digest of the raw file bytes rendered as
//! 64 lowercase hex characters. Equal fingerprints mean the file is
//! skipped without any row-level comparison.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters
pub const FINGERPRINT_LEN: usize = 64;

/// Fingerprint raw bytes
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
