//! Vault core cryptographic primitives.
//!
//! Covers the leaf-level algorithms the rest of the crate builds on: AEAD
//! sealing, secp256k1 ECDSA/ECDH, BIP32 HD derivation, and BIP39
//! mnemonic/seed handling. Nothing here knows about keyfiles, blocks, or
//! the tree -- those layer on top in `crate::keyfile`, `crate::block`, and
//! `crate::navigator`.

pub mod aead;
pub mod ecdh;
pub mod ecdsa;
pub mod hd;
pub mod mnemonic;
pub mod utils;

pub use aead::{seal, unseal, AEAD_KEY_SIZE};
pub use ecdh::shared_secret;
pub use ecdsa::{sign, verify};
pub use hd::{
    child, compressed_public_key, master_key, neuter, ownership_child, public_key,
    root_folder_key, root_folder_path, Xpriv, Xpub,
};
pub use mnemonic::{generate_mnemonic, seed_from_mnemonic};
pub use utils::{hex_decode, hex_encode, random_bytes};
