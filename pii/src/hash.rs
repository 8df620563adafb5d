use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 of the value's UTF-8 bytes. No salt, no key: the
/// conversions API matches on the plain digest.
pub fn hash(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}
