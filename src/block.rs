//! Fixed-size encrypted block codec.
//!
//! Payloads are split into `size`-byte plaintext blocks, each carrying the
//! global block count so a reader can learn how many blocks to fetch from
//! block 0 alone. Empty payloads still produce exactly one block so
//! readers always have a block 0 to probe.

use serde::{Deserialize, Serialize};

use crate::crypto::aead::{seal, unseal, AEAD_KEY_SIZE};
use crate::encoding::base64_bytes;
use crate::error::{CoreError, Result};
use crate::ids::block_id;

/// Plaintext wire form of a single block. `id` is derivable from the
/// owning chain and index, and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "Data", with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(rename = "Padding")]
    pub padding: u32,
    #[serde(rename = "Count")]
    pub count: u32,
}

/// A plaintext block paired with the blob-store id it is addressed at.
pub struct EncryptedBlock {
    pub id: String,
    pub ciphertext: Vec<u8>,
}

/// Split `data` into fixed-`size` plaintext blocks.
///
/// `size` must be nonzero. Zero-length `data` still yields one all-zero
/// block with `Count = 1` rather than an empty chain a reader could never
/// probe block 0 of.
pub fn split(data: &[u8], size: usize) -> Result<Vec<Block>> {
    if size == 0 {
        return Err(CoreError::Format("block size must be nonzero".into()));
    }
    if data.is_empty() {
        return Ok(vec![Block {
            data: vec![0u8; size],
            padding: size as u32,
            count: 1,
        }]);
    }

    let count = data.len().div_ceil(size);
    let blocks = (0..count)
        .map(|i| {
            let start = i * size;
            let end = (start + size).min(data.len());
            let chunk = &data[start..end];
            let mut buf = vec![0u8; size];
            buf[..chunk.len()].copy_from_slice(chunk);
            Block {
                data: buf,
                padding: (size - chunk.len()) as u32,
                count: count as u32,
            }
        })
        .collect();
    Ok(blocks)
}

/// Serialize, then AEAD-encrypt each block of `data`, addressed at
/// `block-id(file_id, index)`.
pub fn encrypt_blocks(
    file_id: &str,
    key: &[u8; AEAD_KEY_SIZE],
    data: &[u8],
    size: usize,
) -> Result<Vec<EncryptedBlock>> {
    split(data, size)?
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            let plaintext = serde_json::to_vec(&block)
                .map_err(|e| CoreError::Format(format!("block encode failed: {e}")))?;
            let ciphertext = seal(key, &plaintext)?;
            Ok(EncryptedBlock {
                id: block_id(file_id, i as u32),
                ciphertext,
            })
        })
        .collect()
}

/// Decrypt and deserialize a single ciphertext block.
pub fn decrypt_block(key: &[u8; AEAD_KEY_SIZE], ciphertext: &[u8]) -> Result<Block> {
    let plaintext = unseal(key, ciphertext)?;
    serde_json::from_slice(&plaintext)
        .map_err(|e| CoreError::Format(format!("block decode failed: {e}")))
}

/// Recompose the original payload from blocks 0..Count-1, in order.
///
/// Yields an empty payload for the single all-zero block written for
/// empty data (its padding covers the whole block).
pub fn recompose(blocks: &[Block], size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for block in blocks {
        let padding = block.padding as usize;
        let keep = size.saturating_sub(padding).min(block.data.len());
        out.extend_from_slice(&block.data[..keep]);
    }
    out
}
