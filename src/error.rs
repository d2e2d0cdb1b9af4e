//! Error taxonomy for the vault core.
//!
//! Mirrors the error categories a holder of the seed can actually hit:
//! malformed input (mnemonic, path), store-level absence, cryptographic
//! failure, and structural corruption of a persisted record.

use thiserror::Error;

/// Errors raised by `BlobStore` implementations.
///
/// Opaque by design -- the core never needs to branch on the concrete
/// I/O failure, only report it.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid mnemonic: {0}")]
    Mnemonic(String),

    #[error("malformed path segment: {0}")]
    Path(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("keyfile signature invalid for key-id {0}")]
    SignatureInvalid(String),

    #[error("block {index} missing from chain {file_id} (expected {expected} blocks)")]
    BlockMissing {
        file_id: String,
        index: u32,
        expected: u32,
    },

    #[error("structured decode failed: {0}")]
    Format(String),

    #[error("blob store error: {0}")]
    Io(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
