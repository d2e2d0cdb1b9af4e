//! Key-id / file-id / block-id derivation.
//!
//! All three namespaces are hex-encoded SHA3-256 digests over concatenated
//! byte strings. The literal label strings and their byte order are part
//! of the on-disk contract -- do not reorder or rename them.

use sha3::{Digest, Sha3_256};

use crate::crypto::hex_encode;

/// `key-id(pub) = sha3_256(compressed(pub) || "key")`, hex-encoded.
pub fn key_id(compressed_pubkey: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(compressed_pubkey);
    hasher.update(b"key");
    hex_encode(&hasher.finalize())
}

/// `file-id(pub, salt) = sha3_256(compressed(pub) || "file" || salt)`, hex-encoded.
pub fn file_id(compressed_pubkey: &[u8], salt: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(compressed_pubkey);
    hasher.update(b"file");
    hasher.update(salt);
    hex_encode(&hasher.finalize())
}

/// `block-id(file_id, index) = sha3_256(utf8(file_id) || "block" || decimal_ascii(index))`.
///
/// Deliberately hashes the *hex string* of `file_id`, not its raw digest
/// bytes -- part of the on-disk contract, not an oversight.
pub fn block_id(file_id: &str, index: u32) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(file_id.as_bytes());
    hasher.update(b"block");
    hasher.update(index.to_string().as_bytes());
    hex_encode(&hasher.finalize())
}
