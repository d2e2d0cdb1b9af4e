//! BIP32-style hierarchical-deterministic key derivation over secp256k1.
//!
//! The root folder key sits at the fixed path `m/44'/0'/0'/0`; every
//! folder/file key below it is a non-hardened child of its parent,
//! indexed by the node's child-index. The ownership key that signs a
//! KeyFile is a further non-hardened derivation, `xkey/0/version`.

use bitcoin::bip32::{ChildNumber, DerivationPath};
use bitcoin::secp256k1::{PublicKey, Secp256k1};
use bitcoin::NetworkKind;

use crate::error::{CoreError, Result};

pub type Xpriv = bitcoin::bip32::Xpriv;
pub type Xpub = bitcoin::bip32::Xpub;

/// Derivation path of the root folder key: `m/44'/0'/0'/0`.
pub fn root_folder_path() -> DerivationPath {
    DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(44).expect("44 is a valid index"),
        ChildNumber::from_hardened_idx(0).expect("0 is a valid index"),
        ChildNumber::from_hardened_idx(0).expect("0 is a valid index"),
        ChildNumber::from_normal_idx(0).expect("0 is a valid index"),
    ])
}

/// Derive the BIP32 master extended private key from a BIP39 seed.
pub fn master_key(seed: &[u8]) -> Result<Xpriv> {
    Xpriv::new_master(NetworkKind::Main, seed).map_err(|e| CoreError::Crypto(e.to_string()))
}

/// Derive the root folder key (`m/44'/0'/0'/0`) from the master key.
pub fn root_folder_key(master: &Xpriv) -> Result<Xpriv> {
    let secp = Secp256k1::new();
    master
        .derive_priv(&secp, &root_folder_path())
        .map_err(|e| CoreError::Crypto(e.to_string()))
}

/// Derive a single non-hardened child by index.
///
/// Index 0 is reserved for the root of a tree -- callers in
/// `navigator` never invoke this with index 0 for a logical child.
pub fn child(parent: &Xpriv, index: u32) -> Result<Xpriv> {
    let secp = Secp256k1::new();
    let child_number =
        ChildNumber::from_normal_idx(index).map_err(|e| CoreError::Crypto(e.to_string()))?;
    parent
        .derive_priv(&secp, &DerivationPath::from(vec![child_number]))
        .map_err(|e| CoreError::Crypto(e.to_string()))
}

/// Derive the ownership key for a KeyFile version: `xkey/0/version`.
///
/// Rotating the version rotates the ownership key, invalidating signatures
/// made under the previous one.
pub fn ownership_child(node: &Xpriv, version: u64) -> Result<Xpriv> {
    let secp = Secp256k1::new();
    let version_index =
        u32::try_from(version).map_err(|_| CoreError::Crypto("version exceeds u32 range".into()))?;
    let path = DerivationPath::from(vec![
        ChildNumber::from_normal_idx(0).expect("0 is a valid index"),
        ChildNumber::from_normal_idx(version_index).map_err(|e| CoreError::Crypto(e.to_string()))?,
    ]);
    node.derive_priv(&secp, &path)
        .map_err(|e| CoreError::Crypto(e.to_string()))
}

/// Uncompressed-curve public key of an extended key.
pub fn public_key(xkey: &Xpriv) -> PublicKey {
    let secp = Secp256k1::new();
    PublicKey::from_secret_key(&secp, &xkey.private_key)
}

/// 33-byte SEC1-compressed public key, the form hashed by `ids::key_id`
/// and `ids::file_id`.
pub fn compressed_public_key(xkey: &Xpriv) -> [u8; 33] {
    public_key(xkey).serialize()
}

/// Neutered (public-only) extended key: a shareable read-only capability
/// to a subtree.
pub fn neuter(xkey: &Xpriv) -> Xpub {
    let secp = Secp256k1::new();
    Xpub::from_priv(&secp, xkey)
}
