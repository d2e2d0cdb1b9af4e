//! Node factory: assembles a KeyFile plus metadata and (for files) data
//! block chains for a single logical folder/file.

use serde::{Deserialize, Serialize};

use crate::block::{self, EncryptedBlock};
use crate::crypto::hd::{self, Xpriv};
use crate::error::{CoreError, Result};
use crate::ids::file_id;
use crate::keyfile::{self, KeyFile};

/// Folder/file display metadata. Encoded as the empty byte string --
/// not an empty record -- when the node is a tombstone, so readers can
/// distinguish "deleted" from "zero tags".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub node_type: String,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
}

impl Meta {
    /// The "folder" meta type.
    pub const FOLDER: &'static str = "folder";
    /// The "file" meta type.
    pub const FILE: &'static str = "file";

    pub fn folder(name: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            node_type: Self::FOLDER.to_string(),
            tags,
        }
    }

    pub fn file(name: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            node_type: Self::FILE.to_string(),
            tags,
        }
    }

    /// The tombstone meta: empty type marks the node as deleted.
    pub fn tombstone() -> Self {
        Self {
            name: String::new(),
            node_type: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.node_type.is_empty()
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == Self::FOLDER
    }
}

/// A fully assembled node, ready to publish to the blob store: its
/// derived HD key, its KeyFile, and its meta/data block chains.
pub struct Node {
    pub key: Xpriv,
    pub keyfile: KeyFile,
    pub meta_blocks: Vec<EncryptedBlock>,
    pub data_blocks: Vec<EncryptedBlock>,
}

fn encode_meta(meta: &Meta) -> Result<Vec<u8>> {
    if meta.is_tombstone() {
        return Ok(Vec::new());
    }
    serde_json::to_vec(meta).map_err(|e| CoreError::Format(format!("meta encode failed: {e}")))
}

/// Decode a meta payload. An empty payload decodes to the tombstone meta.
pub fn decode_meta(payload: &[u8]) -> Result<Meta> {
    if payload.is_empty() {
        return Ok(Meta::tombstone());
    }
    serde_json::from_slice(payload).map_err(|e| CoreError::Format(format!("meta decode failed: {e}")))
}

/// Assemble a node at `(parent, index)`.
///
/// `index` must be >= 1 -- index 0 is reserved for a tree's root and is
/// never a child index.
pub fn create_file(
    parent: &Xpriv,
    index: u32,
    meta: &Meta,
    data: &[u8],
    block_size: usize,
    version: u64,
) -> Result<Node> {
    if index == 0 {
        return Err(CoreError::Path("child index must be >= 1".into()));
    }

    let key = hd::child(parent, index)?;
    let (keyfile, _owner_pub) = keyfile::create(&key, version)?;
    let pubkey = hd::compressed_public_key(&key);

    let meta_payload = encode_meta(meta)?;
    let meta_file_id = file_id(&pubkey, &keyfile.meta_salt);
    let meta_blocks = block::encrypt_blocks(&meta_file_id, &keyfile.key, &meta_payload, block_size)?;

    let data_file_id = file_id(&pubkey, &keyfile.file_salt);
    let data_blocks = block::encrypt_blocks(&data_file_id, &keyfile.key, data, block_size)?;

    Ok(Node {
        key,
        keyfile,
        meta_blocks,
        data_blocks,
    })
}

/// `create_folder` is `create_file` with empty data and version 0.
pub fn create_folder(parent: &Xpriv, index: u32, meta: &Meta, block_size: usize) -> Result<Node> {
    create_file(parent, index, meta, &[], block_size, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Xpriv {
        let master = hd::master_key(&[1u8; 64]).unwrap();
        hd::root_folder_key(&master).unwrap()
    }

    #[test]
    fn create_folder_rejects_index_zero() {
        let parent = root();
        let meta = Meta::folder("x", vec![]);
        assert!(create_folder(&parent, 0, &meta, 16).is_err());
    }

    #[test]
    fn folder_has_one_empty_data_block() {
        let parent = root();
        let meta = Meta::folder("docs", vec!["a".into()]);
        let node = create_folder(&parent, 1, &meta, 16).unwrap();
        assert_eq!(node.data_blocks.len(), 1);
        assert_eq!(node.keyfile.version, 0);
    }

    #[test]
    fn tombstone_meta_encodes_as_empty_payload() {
        assert_eq!(encode_meta(&Meta::tombstone()).unwrap(), Vec::<u8>::new());
        assert!(decode_meta(&[]).unwrap().is_tombstone());
    }

    #[test]
    fn distinct_indices_produce_distinct_keys() {
        let parent = root();
        let meta = Meta::folder("x", vec![]);
        let a = create_folder(&parent, 1, &meta, 16).unwrap();
        let b = create_folder(&parent, 2, &meta, 16).unwrap();
        assert_ne!(
            a.key.private_key.secret_bytes(),
            b.key.private_key.secret_bytes()
        );
    }

    #[test]
    fn file_meta_round_trips_through_json() {
        let meta = Meta::file("x.txt", vec!["t1".into(), "t2".into()]);
        let payload = encode_meta(&meta).unwrap();
        let decoded = decode_meta(&payload).unwrap();
        assert_eq!(decoded, meta);
    }
}
