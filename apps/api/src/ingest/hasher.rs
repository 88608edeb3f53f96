use sha2::{Digest, Sha256};

/// Content digest of an upload: lowercase hex SHA-256.
///
/// Used as an opaque identity for duplicate detection only.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
