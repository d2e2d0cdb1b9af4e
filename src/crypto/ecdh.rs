//! ECDH shared-secret derivation for the KeyFile AEAD key.
//!
//! The raw shared secret is 32 bytes but the AEAD key is 16; only the
//! first 16 bytes of the shared-secret buffer are used. This truncation is
//! load-bearing for on-disk compatibility.

use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, SecretKey};

use super::aead::AEAD_KEY_SIZE;

/// Derive the AEAD key shared between `private_key` and `public_key`.
///
/// Symmetric: `shared_secret(e_priv, node_pub) == shared_secret(node_priv, e_pub)`
/// whenever `(e_priv, e_pub)` and `(node_priv, node_pub)` are the two
/// keypairs involved in a KeyFile's creation and reading.
pub fn shared_secret(private_key: &SecretKey, public_key: &PublicKey) -> [u8; AEAD_KEY_SIZE] {
    let shared = SharedSecret::new(public_key, private_key);
    let mut key = [0u8; AEAD_KEY_SIZE];
    key.copy_from_slice(&shared.secret_bytes()[..AEAD_KEY_SIZE]);
    key
}
