//! The per-node authenticated envelope.
//!
//! Persisted at `key_id(node)`: AEAD-encrypted salts and version, an
//! ephemeral public key in the clear, and a DER ECDSA signature over the
//! *ciphertext* fields, not the plaintext -- unusual, but load-bearing for
//! on-disk compatibility.

use secp256k1::{Keypair, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use zeroize::Zeroizing;

use crate::crypto::aead::{seal, unseal, AEAD_KEY_SIZE};
use crate::crypto::hd::{self, Xpriv};
use crate::crypto::{ecdh, ecdsa, random_bytes};
use crate::encoding::base64_bytes;
use crate::error::{CoreError, Result};

/// Salt size for `MetaSalt`/`FileSalt`, in bytes.
pub const SALT_SIZE: usize = 16;

/// Public, persisted envelope. The AEAD key itself is never serialized --
/// it is recomputed from `EphemKey` by whoever holds the node's HD private
/// key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFileEnvelope {
    #[serde(rename = "MetaSalt", with = "base64_bytes")]
    pub meta_salt_ct: Vec<u8>,
    #[serde(rename = "FileSalt", with = "base64_bytes")]
    pub file_salt_ct: Vec<u8>,
    #[serde(rename = "Version", with = "base64_bytes")]
    pub version_ct: Vec<u8>,
    #[serde(rename = "EphemKey", with = "base64_bytes")]
    pub ephem_key: Vec<u8>,
    #[serde(rename = "Signature", with = "base64_bytes")]
    pub signature: Vec<u8>,
}

/// In-memory, decrypted view of a node's KeyFile: the persisted envelope
/// plus everything derivable from it once the reader's key is available.
#[derive(Debug, Clone)]
pub struct KeyFile {
    pub envelope: KeyFileEnvelope,
    pub meta_salt: Vec<u8>,
    pub file_salt: Vec<u8>,
    pub version: u64,
    /// Wiped on drop -- this is the AEAD key, not persisted material
    /// (matches `crypto/ed25519.rs`'s zeroize-on-drop for private keys).
    pub key: Zeroizing<[u8; AEAD_KEY_SIZE]>,
}

fn signing_digest(envelope: &KeyFileEnvelope) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(&envelope.meta_salt_ct);
    hasher.update(&envelope.file_salt_ct);
    hasher.update(&envelope.version_ct);
    hasher.update(&envelope.ephem_key);
    hasher.finalize().into()
}

fn ownership_keys(node: &Xpriv, version: u64) -> Result<(SecretKey, PublicKey)> {
    let owner = hd::ownership_child(node, version)?;
    let public_key = hd::public_key(&owner);
    Ok((owner.private_key, public_key))
}

/// Create a fresh KeyFile for `node` at `version`.
///
/// Returns the KeyFile plus the ownership public key it was signed under,
/// so callers deriving further keys don't need to re-derive it.
pub fn create(node: &Xpriv, version: u64) -> Result<(KeyFile, PublicKey)> {
    let secp = Secp256k1::new();
    let node_pub = hd::public_key(node);

    let ephem = Keypair::new(&secp, &mut rand::rngs::OsRng);
    let ephem_priv = ephem.secret_key();
    let ephem_pub = ephem.public_key();

    let key = ecdh::shared_secret(&ephem_priv, &node_pub);

    let meta_salt = random_bytes(SALT_SIZE);
    let file_salt = random_bytes(SALT_SIZE);
    let version_bytes = version.to_string().into_bytes();

    let mut envelope = KeyFileEnvelope {
        meta_salt_ct: seal(&key, &meta_salt)?,
        file_salt_ct: seal(&key, &file_salt)?,
        version_ct: seal(&key, &version_bytes)?,
        ephem_key: ephem_pub.serialize_uncompressed().to_vec(),
        signature: Vec::new(),
    };

    let digest = signing_digest(&envelope);
    let (owner_priv, owner_pub) = ownership_keys(node, version)?;
    envelope.signature = ecdsa::sign(&owner_priv, &digest);

    let keyfile = KeyFile {
        envelope,
        meta_salt,
        file_salt,
        version,
        key: Zeroizing::new(key),
    };
    Ok((keyfile, owner_pub))
}

/// Parse and decrypt a persisted envelope for `node`'s HD key.
///
/// Recomputes the shared AEAD key from the node's own HD private key and
/// the envelope's plaintext `EphemKey`, then decrypts the salts/version.
/// Does not verify the signature -- call [`verify`] separately, since
/// parse failures (`FormatError`/`CryptoError`) and signature failures
/// (`SignatureInvalid`) are distinct error cases.
pub fn parse(node: &Xpriv, bytes: &[u8]) -> Result<KeyFile> {
    let envelope: KeyFileEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| CoreError::Format(format!("keyfile decode failed: {e}")))?;

    let ephem_pub = PublicKey::from_slice(&envelope.ephem_key)
        .map_err(|e| CoreError::Crypto(format!("malformed ephemeral key: {e}")))?;
    let key = ecdh::shared_secret(&node.private_key, &ephem_pub);

    let meta_salt = unseal(&key, &envelope.meta_salt_ct)?;
    let file_salt = unseal(&key, &envelope.file_salt_ct)?;
    let version_bytes = unseal(&key, &envelope.version_ct)?;
    let version_str = String::from_utf8(version_bytes)
        .map_err(|e| CoreError::Format(format!("non-utf8 version: {e}")))?;
    let version: u64 = version_str
        .parse()
        .map_err(|_| CoreError::Format(format!("malformed version: {version_str:?}")))?;

    Ok(KeyFile {
        envelope,
        meta_salt,
        file_salt,
        version,
        key: Zeroizing::new(key),
    })
}

/// Recompute the signing digest and check the signature under the
/// ownership key for the KeyFile's own declared version.
///
/// A `false` result means the node is corrupt or forged, not that the
/// envelope failed to parse.
pub fn verify(node: &Xpriv, keyfile: &KeyFile) -> Result<bool> {
    let (_, owner_pub) = ownership_keys(node, keyfile.version)?;
    let digest = signing_digest(&keyfile.envelope);
    Ok(ecdsa::verify(&owner_pub, &digest, &keyfile.envelope.signature))
}

/// Serialize a KeyFile's envelope to its canonical wire form.
pub fn serialize(keyfile: &KeyFile) -> Result<Vec<u8>> {
    serde_json::to_vec(&keyfile.envelope)
        .map_err(|e| CoreError::Format(format!("keyfile encode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_xpriv(seed_byte: u8) -> Xpriv {
        hd::master_key(&[seed_byte; 64]).unwrap()
    }

    #[test]
    fn creator_and_reader_derive_the_same_key() {
        let node = test_xpriv(42);
        let (keyfile, _) = create(&node, 0).unwrap();
        let bytes = serialize(&keyfile).unwrap();
        let parsed = parse(&node, &bytes).unwrap();
        assert_eq!(keyfile.key, parsed.key);
        assert_eq!(keyfile.meta_salt, parsed.meta_salt);
        assert_eq!(keyfile.file_salt, parsed.file_salt);
        assert_eq!(keyfile.version, parsed.version);
    }

    #[test]
    fn round_trip_verifies() {
        let node = test_xpriv(7);
        let (keyfile, _) = create(&node, 3).unwrap();
        let bytes = serialize(&keyfile).unwrap();
        let parsed = parse(&node, &bytes).unwrap();
        assert!(verify(&node, &parsed).unwrap());
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let node = test_xpriv(9);
        let (mut keyfile, _) = create(&node, 0).unwrap();
        keyfile.envelope.signature[0] ^= 0xff;
        assert!(!verify(&node, &keyfile).unwrap());
    }

    #[test]
    fn wrong_node_key_cannot_decrypt() {
        let node = test_xpriv(1);
        let other = test_xpriv(2);
        let (keyfile, _) = create(&node, 0).unwrap();
        let bytes = serialize(&keyfile).unwrap();
        assert!(parse(&other, &bytes).is_err());
    }
}
