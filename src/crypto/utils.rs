//! Miscellaneous crypto helpers: random byte generation and hex codecs.

use rand::RngCore;

use crate::error::{CoreError, Result};

/// Fill `buf` with cryptographically strong random bytes.
fn fill_random(buf: &mut [u8]) {
    rand::rngs::OsRng.fill_bytes(buf);
}

/// Generate `len` cryptographically strong random bytes.
///
/// Honors the requested length exactly -- a fixed 12-byte nonce helper
/// would silently truncate 16-byte salts, so nonces and salts each ask
/// for their own length here.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf);
    buf
}

/// Hex-encode a byte slice (lowercase, no separators).
pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string into bytes.
pub fn hex_decode(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| CoreError::Format(format!("invalid hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_honors_requested_length() {
        assert_eq!(random_bytes(12).len(), 12);
        assert_eq!(random_bytes(16).len(), 16);
        assert_eq!(random_bytes(0).len(), 0);
    }

    #[test]
    fn hex_round_trips() {
        let bytes = [0xde, 0xad, 0xbe, 0xef];
        let encoded = hex_encode(&bytes);
        assert_eq!(encoded, "deadbeef");
        assert_eq!(hex_decode(&encoded).unwrap(), bytes);
    }
}
