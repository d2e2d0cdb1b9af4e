//! `vaultfs-core`: an encrypted, content-addressed virtual filesystem
//! whose authority derives from an HD key tree rooted at a user's
//! mnemonic-derived seed.
//!
//! Layered bottom-up: [`crypto`] primitives, [`ids`] derivation, the
//! [`block`] codec, the [`keyfile`] envelope, the [`node`] factory, the
//! [`store`] capability, the [`navigator`] tree cache, and the [`client`]
//! façade. The blob store's own storage medium, HTTP plumbing, session
//! tables, and environment configuration are out of scope -- this crate
//! only consumes [`store::BlobStore`].

pub mod block;
pub mod client;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod ids;
pub mod keyfile;
pub mod navigator;
pub mod node;
pub mod store;

pub use client::Client;
pub use error::{CoreError, Result};
pub use store::{BlobStore, DiskBlobStore, MemoryBlobStore};
