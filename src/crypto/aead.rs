//! AES-128-GCM encryption/decryption.
//!
//! Sealed format: nonce (12 bytes) || ciphertext || auth tag (16 bytes).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};

use crate::error::{CoreError, Result};

use super::utils::random_bytes;

/// AES-128-GCM key size in bytes.
pub const AEAD_KEY_SIZE: usize = 16;

/// AES-GCM nonce size in bytes.
pub const AEAD_NONCE_SIZE: usize = 12;

const MIN_SEALED_SIZE: usize = AEAD_NONCE_SIZE + 16;

/// Encrypt `plaintext` under `key` with a fresh random nonce, returning
/// `nonce || ciphertext_with_tag`.
pub fn seal(key: &[u8; AEAD_KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm::new_from_slice(key).map_err(|e| CoreError::Crypto(e.to_string()))?;
    let nonce_bytes = random_bytes(AEAD_NONCE_SIZE);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CoreError::Crypto("AEAD encryption failed".into()))?;

    let mut sealed = Vec::with_capacity(AEAD_NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Recover the plaintext from a blob produced by [`seal`].
pub fn unseal(key: &[u8; AEAD_KEY_SIZE], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < MIN_SEALED_SIZE {
        return Err(CoreError::Crypto("sealed blob too short".into()));
    }
    let cipher = Aes128Gcm::new_from_slice(key).map_err(|e| CoreError::Crypto(e.to_string()))?;
    let nonce = Nonce::from_slice(&sealed[..AEAD_NONCE_SIZE]);
    let ciphertext = &sealed[AEAD_NONCE_SIZE..];

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CoreError::Crypto("AEAD tag mismatch".into()))
}
