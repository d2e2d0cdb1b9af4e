//! The lazy, arena-backed tree cache.
//!
//! Nodes are addressed by `(parent, child-index)` and materialized on
//! first access: the navigator derives the child's HD key, probes the
//! blob store for its KeyFile, and -- only on full success -- commits a
//! new arena entry into the parent's child map. A failed probe leaves the
//! arena untouched, so there is never a placeholder to clean up on error.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::block::{self, Block};
use crate::crypto::aead::AEAD_KEY_SIZE;
use crate::crypto::hd::{self, Xpriv};
use crate::error::{CoreError, Result};
use crate::ids::{block_id, file_id, key_id};
use crate::keyfile::{self, KeyFile};
use crate::node::{self, Meta, Node};
use crate::store::BlobStore;

/// Stable handle into the navigator's arena.
pub type NodeHandle = usize;

struct ArenaNode {
    parent: NodeHandle,
    index: u32,
    key: Xpriv,
    pubkey: [u8; 33],
    keyfile: Option<KeyFile>,
    meta: Option<Meta>,
    children: BTreeMap<u32, NodeHandle>,
    path: String,
}

/// A parsed path segment. `.` segments are dropped
/// during parsing rather than represented -- they are identity.
enum Segment {
    Parent,
    Index(u32),
}

/// The materialized tree cache plus the current-working-directory cursor.
pub struct Navigator {
    store: Arc<dyn BlobStore>,
    arena: Vec<ArenaNode>,
    root: NodeHandle,
    cwd: NodeHandle,
    block_size: usize,
}

impl Navigator {
    /// Root folder key is `root`; root's parent is itself.
    pub fn new(root_key: Xpriv, store: Arc<dyn BlobStore>, block_size: usize) -> Self {
        let pubkey = hd::compressed_public_key(&root_key);
        let root_node = ArenaNode {
            parent: 0,
            index: 0,
            key: root_key,
            pubkey,
            keyfile: None,
            meta: None,
            children: BTreeMap::new(),
            path: "/".to_string(),
        };
        Navigator {
            store,
            arena: vec![root_node],
            root: 0,
            cwd: 0,
            block_size,
        }
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn cwd(&self) -> NodeHandle {
        self.cwd
    }

    pub fn path_of(&self, handle: NodeHandle) -> String {
        self.arena[handle].path.clone()
    }

    pub fn meta_of(&self, handle: NodeHandle) -> Option<Meta> {
        self.arena[handle].meta.clone()
    }

    pub fn extended_public_key(&self, handle: NodeHandle) -> hd::Xpub {
        hd::neuter(&self.arena[handle].key)
    }

    /// Discard a folder's materialized child map so the next `ls` re-lists
    /// it from scratch against the current store state.
    pub fn refresh(&mut self, folder: NodeHandle) {
        self.arena[folder].children.clear();
    }

    // ---- lazy materialization ------------------------------------------------

    /// Materialize `(parent, index)`, returning `None` if no KeyFile exists
    /// there yet (the `ls` frontier-stop condition).
    async fn materialize_child(&mut self, parent: NodeHandle, index: u32) -> Result<Option<NodeHandle>> {
        if let Some(&handle) = self.arena[parent].children.get(&index) {
            return Ok(Some(handle));
        }

        let parent_key = self.arena[parent].key.clone();
        let child_key = hd::child(&parent_key, index)?;
        let pubkey = hd::compressed_public_key(&child_key);
        let kid = key_id(&pubkey);

        if !self.store.exists(&kid).await.map_err(CoreError::Io)? {
            return Ok(None);
        }

        let keyfile_bytes = self.store.download(&kid).await.map_err(CoreError::Io)?;
        let keyfile = keyfile::parse(&child_key, &keyfile_bytes)?;
        if !keyfile::verify(&child_key, &keyfile)? {
            log::error!("signature verification failed for key-id {kid} at declared version {}", keyfile.version);
            return Err(CoreError::SignatureInvalid(kid));
        }

        let meta = self.fetch_meta(&pubkey, &keyfile).await?;

        let parent_path = self.arena[parent].path.clone();
        let path = child_path(&parent_path, index);

        let handle = self.arena.len();
        self.arena.push(ArenaNode {
            parent,
            index,
            key: child_key,
            pubkey,
            keyfile: Some(keyfile),
            meta: Some(meta),
            children: BTreeMap::new(),
            path,
        });
        self.arena[parent].children.insert(index, handle);
        Ok(Some(handle))
    }

    async fn fetch_meta(&self, pubkey: &[u8; 33], keyfile: &KeyFile) -> Result<Meta> {
        let meta_fid = file_id(pubkey, &keyfile.meta_salt);
        let blocks = self.fetch_chain(&meta_fid, &keyfile.key).await?;
        let payload = block::recompose(&blocks, self.block_size);
        node::decode_meta(&payload)
    }

    /// Download block 0 of `file_id`'s chain to learn `Count`, then the
    /// rest in order. Missing block 0 or any block in `1..Count` surfaces
    /// `BlockMissing` -- the chain was only partially published.
    async fn fetch_chain(&self, file_id: &str, key: &[u8; AEAD_KEY_SIZE]) -> Result<Vec<Block>> {
        let block0_id = block_id(file_id, 0);
        if !self.store.exists(&block0_id).await.map_err(CoreError::Io)? {
            return Err(CoreError::BlockMissing {
                file_id: file_id.to_string(),
                index: 0,
                expected: 1,
            });
        }
        let block0_ct = self.store.download(&block0_id).await.map_err(CoreError::Io)?;
        let block0 = block::decrypt_block(key, &block0_ct)?;
        let count = block0.count;

        let mut blocks = Vec::with_capacity(count as usize);
        blocks.push(block0);
        for i in 1..count {
            let bid = block_id(file_id, i);
            if !self.store.exists(&bid).await.map_err(CoreError::Io)? {
                return Err(CoreError::BlockMissing {
                    file_id: file_id.to_string(),
                    index: i,
                    expected: count,
                });
            }
            let ct = self.store.download(&bid).await.map_err(CoreError::Io)?;
            blocks.push(block::decrypt_block(key, &ct)?);
        }
        Ok(blocks)
    }

    /// Block ids of a chain without decrypting past block 0 -- used by
    /// `rm` to locate blobs to delete.
    async fn chain_ids(&self, file_id: &str, key: &[u8; AEAD_KEY_SIZE]) -> Result<Vec<String>> {
        let block0_id = block_id(file_id, 0);
        if !self.store.exists(&block0_id).await.map_err(CoreError::Io)? {
            return Err(CoreError::BlockMissing {
                file_id: file_id.to_string(),
                index: 0,
                expected: 1,
            });
        }
        let block0_ct = self.store.download(&block0_id).await.map_err(CoreError::Io)?;
        let block0 = block::decrypt_block(key, &block0_ct)?;
        Ok((0..block0.count).map(|i| block_id(file_id, i)).collect())
    }

    // ---- listing & allocation -------------------------------------------------

    /// Materialize children at indices 1, 2, 3, ... until the first
    /// absent `key-id`. Tombstoned indices are probed (so the frontier
    /// moves past them) but excluded from the returned map: a tombstone's
    /// meta decodes to empty, and an empty-type meta is treated as deleted.
    pub async fn ls(&mut self, folder: NodeHandle) -> Result<BTreeMap<u32, NodeHandle>> {
        let mut result = BTreeMap::new();
        let mut i = 1u32;
        loop {
            match self.materialize_child(folder, i).await? {
                Some(handle) => {
                    let is_tombstone = self.arena[handle]
                        .meta
                        .as_ref()
                        .map(Meta::is_tombstone)
                        .unwrap_or(false);
                    if !is_tombstone {
                        result.insert(i, handle);
                    }
                    i += 1;
                }
                None => {
                    log::debug!("ls frontier stop at index {i} under {}", self.arena[folder].path);
                    break;
                }
            }
        }
        Ok(result)
    }

    /// Probe successive indices from 1 via `key-id` existence until an
    /// absent one is found.
    pub async fn allocate_next(&self, parent: NodeHandle) -> Result<u32> {
        let parent_key = self.arena[parent].key.clone();
        let mut i = 1u32;
        loop {
            let child_key = hd::child(&parent_key, i)?;
            let kid = key_id(&hd::compressed_public_key(&child_key));
            if !self.store.exists(&kid).await.map_err(CoreError::Io)? {
                return Ok(i);
            }
            i += 1;
        }
    }

    // ---- mutation ---------------------------------------------------------

    async fn publish(&self, node: &Node) -> Result<()> {
        let kid = key_id(&hd::compressed_public_key(&node.key));
        let envelope = keyfile::serialize(&node.keyfile)?;
        self.store.upload(&kid, envelope).await.map_err(CoreError::Io)?;
        for b in &node.meta_blocks {
            self.store.upload(&b.id, b.ciphertext.clone()).await.map_err(CoreError::Io)?;
        }
        for b in &node.data_blocks {
            self.store.upload(&b.id, b.ciphertext.clone()).await.map_err(CoreError::Io)?;
        }
        Ok(())
    }

    fn insert_created(&mut self, parent: NodeHandle, index: u32, created: Node, meta: Meta) -> NodeHandle {
        let parent_path = self.arena[parent].path.clone();
        let path = child_path(&parent_path, index);
        let pubkey = hd::compressed_public_key(&created.key);
        let handle = self.arena.len();
        self.arena.push(ArenaNode {
            parent,
            index,
            key: created.key,
            pubkey,
            keyfile: Some(created.keyfile),
            meta: Some(meta),
            children: BTreeMap::new(),
            path,
        });
        self.arena[parent].children.insert(index, handle);
        handle
    }

    /// Create a new folder under `parent`, publish its blobs, and cache it.
    pub async fn mkdir(&mut self, parent: NodeHandle, meta: Meta) -> Result<NodeHandle> {
        let index = self.allocate_next(parent).await?;
        let parent_key = self.arena[parent].key.clone();
        let created = node::create_folder(&parent_key, index, &meta, self.block_size)?;
        self.publish(&created).await?;
        Ok(self.insert_created(parent, index, created, meta))
    }

    /// Create a new file under `parent` with `data`, publish its blobs,
    /// and cache it.
    pub async fn upload(&mut self, parent: NodeHandle, meta: Meta, data: &[u8]) -> Result<NodeHandle> {
        let index = self.allocate_next(parent).await?;
        let parent_key = self.arena[parent].key.clone();
        let created = node::create_file(&parent_key, index, &meta, data, self.block_size, 0)?;
        self.publish(&created).await?;
        Ok(self.insert_created(parent, index, created, meta))
    }

    /// Recompose the data chain for a materialized file node.
    ///
    /// The root has no KeyFile of its own (it is never fetched through
    /// `materialize_child`), so it is rejected here the same way `cd`
    /// rejects it as a non-folder target.
    pub async fn download(&self, handle: NodeHandle) -> Result<Vec<u8>> {
        if handle == self.root {
            return Err(CoreError::Path(format!(
                "{} is not a file",
                self.arena[handle].path
            )));
        }
        let arena_node = &self.arena[handle];
        let keyfile = arena_node
            .keyfile
            .as_ref()
            .expect("materialized node has a keyfile");
        let data_fid = file_id(&arena_node.pubkey, &keyfile.file_salt);
        let blocks = self.fetch_chain(&data_fid, &keyfile.key).await?;
        Ok(block::recompose(&blocks, self.block_size))
    }

    /// Tombstone `(parent, index)`: delete the old blobs,
    /// then publish a replacement KeyFile with empty meta and
    /// `version + 1`, preserving index density.
    pub async fn rm(&mut self, parent: NodeHandle, index: u32) -> Result<()> {
        self.refresh(parent);
        let handle = self
            .materialize_child(parent, index)
            .await?
            .ok_or_else(|| CoreError::NotFound(child_path(&self.arena[parent].path, index)))?;

        let pubkey = self.arena[handle].pubkey;
        let keyfile = self.arena[handle]
            .keyfile
            .clone()
            .expect("materialized node has a keyfile");
        let kid = key_id(&pubkey);

        let meta_fid = file_id(&pubkey, &keyfile.meta_salt);
        let meta_ids = self.chain_ids(&meta_fid, &keyfile.key).await?;
        let data_fid = file_id(&pubkey, &keyfile.file_salt);
        let data_ids = self.chain_ids(&data_fid, &keyfile.key).await?;

        self.store.delete(&kid).await.map_err(CoreError::Io)?;
        for id in &meta_ids {
            self.store.delete(id).await.map_err(CoreError::Io)?;
        }
        for id in &data_ids {
            self.store.delete(id).await.map_err(CoreError::Io)?;
        }

        let version = keyfile.version + 1;
        let parent_key = self.arena[parent].key.clone();
        let tombstone = node::create_file(&parent_key, index, &Meta::tombstone(), &[], self.block_size, version)?;
        log::info!("tombstoning {} at version {version}", child_path(&self.arena[parent].path, index));
        self.publish(&tombstone).await?;

        self.refresh(parent);
        Ok(())
    }

    /// Depth-first tag search. Only leaves are tested: a
    /// folder whose `ls` is non-empty is never tested against `query`,
    /// only recursed into.
    pub async fn find(&mut self, start: NodeHandle, query: &str) -> Result<Vec<(String, Meta)>> {
        let mut results = Vec::new();
        let mut stack = vec![start];
        while let Some(handle) = stack.pop() {
            let children = self.ls(handle).await?;
            if children.is_empty() {
                if handle != self.root {
                    let meta = self.arena[handle].meta.clone().expect("materialized node has meta");
                    if meta.tags.iter().any(|t| t == query) {
                        results.push((self.arena[handle].path.clone(), meta));
                    }
                }
                continue;
            }
            stack.extend(children.into_values());
        }
        Ok(results)
    }

    // ---- path resolution ----------------------------------------------------

    /// Lexically collapse `Index, Parent` pairs, `Clean()`-style, so a `".."`
    /// cancelling a segment never needs that segment to exist in the store.
    /// A `Parent` that isn't preceded by an `Index` -- e.g. a relative path
    /// starting with `".."` -- has nothing lexical to cancel and is kept as
    /// a real ascend.
    fn normalize_segments(segments: Vec<Segment>) -> Vec<Segment> {
        let mut stack: Vec<Segment> = Vec::new();
        for seg in segments {
            match seg {
                Segment::Parent if matches!(stack.last(), Some(Segment::Index(_))) => {
                    stack.pop();
                }
                seg => stack.push(seg),
            }
        }
        stack
    }

    fn parse_path(path: &str) -> Result<(bool, Vec<Segment>)> {
        let absolute = path.starts_with('/');
        let mut segments = Vec::new();
        for part in path.split('/') {
            if part.is_empty() || part == "." {
                continue;
            }
            if part == ".." {
                segments.push(Segment::Parent);
                continue;
            }
            let idx: u32 = part
                .parse()
                .map_err(|_| CoreError::Path(format!("not a decimal child index: {part:?}")))?;
            segments.push(Segment::Index(idx));
        }
        Ok((absolute, Self::normalize_segments(segments)))
    }

    /// Resolve `path` (relative to `from` unless it starts with `/`) to a
    /// node handle. Tombstoned indices resolve as `NotFound`.
    pub async fn resolve(&mut self, path: &str, from: NodeHandle) -> Result<NodeHandle> {
        let (absolute, segments) = Self::parse_path(path)?;
        let mut cur = if absolute { self.root } else { from };
        for seg in segments {
            cur = match seg {
                Segment::Parent => self.arena[cur].parent,
                Segment::Index(idx) => {
                    let handle = self
                        .materialize_child(cur, idx)
                        .await?
                        .ok_or_else(|| CoreError::NotFound(child_path(&self.arena[cur].path, idx)))?;
                    let is_tombstone = self.arena[handle]
                        .meta
                        .as_ref()
                        .map(Meta::is_tombstone)
                        .unwrap_or(false);
                    if is_tombstone {
                        return Err(CoreError::NotFound(child_path(&self.arena[cur].path, idx)));
                    }
                    handle
                }
            };
        }
        Ok(cur)
    }

    /// Resolve `path` to its parent handle and final child index, for
    /// operations (`rm`) that name a node rather than descend into it.
    pub async fn resolve_parent(&mut self, path: &str, from: NodeHandle) -> Result<(NodeHandle, u32)> {
        let (absolute, segments) = Self::parse_path(path)?;
        if segments.is_empty() {
            return Err(CoreError::Path("path does not name a node".into()));
        }
        let mut cur = if absolute { self.root } else { from };
        let last = segments.len() - 1;
        for seg in &segments[..last] {
            cur = match seg {
                Segment::Parent => self.arena[cur].parent,
                Segment::Index(idx) => self
                    .materialize_child(cur, *idx)
                    .await?
                    .ok_or_else(|| CoreError::NotFound(child_path(&self.arena[cur].path, *idx)))?,
            };
        }
        match segments[last] {
            Segment::Index(idx) => Ok((cur, idx)),
            Segment::Parent => Err(CoreError::Path("'..' does not name a node".into())),
        }
    }

    /// Resolve `path` and change the cwd cursor to it. The target must be
    /// the root or a folder -- `cd` into a file is rejected as a `PathError`.
    pub async fn cd(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path, self.cwd).await?;
        if target != self.root {
            let meta = self.arena[target].meta.as_ref().expect("resolved node has meta");
            if !meta.is_folder() {
                return Err(CoreError::Path(format!("{} is not a folder", self.arena[target].path)));
            }
        }
        self.cwd = target;
        Ok(())
    }

    pub fn pwd(&self) -> String {
        self.arena[self.cwd].path.clone()
    }
}

fn child_path(parent_path: &str, index: u32) -> String {
    if parent_path == "/" {
        format!("/{index}")
    } else {
        format!("{parent_path}/{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hd;
    use crate::store::MemoryBlobStore;

    fn navigator() -> Navigator {
        let master = hd::master_key(&[1u8; 64]).unwrap();
        let root = hd::root_folder_key(&master).unwrap();
        Navigator::new(root, Arc::new(MemoryBlobStore::new()), 16)
    }

    #[tokio::test]
    async fn mkdir_then_ls_round_trips() {
        let mut nav = navigator();
        let root = nav.root();
        let meta = Meta::folder("docs", vec!["a".into()]);
        let handle = nav.mkdir(root, meta.clone()).await.unwrap();
        assert_eq!(nav.path_of(handle), "/1");

        let children = nav.ls(root).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(nav.meta_of(children[&1]).unwrap(), meta);
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let mut nav = navigator();
        let root = nav.root();
        nav.mkdir(root, Meta::folder("docs", vec![])).await.unwrap();
        let file_meta = Meta::file("x", vec![]);
        let handle = nav.upload(root, file_meta, b"HelloWorld!!").await.unwrap();
        assert_eq!(nav.path_of(handle), "/2");
        let data = nav.download(handle).await.unwrap();
        assert_eq!(data, b"HelloWorld!!");
    }

    #[tokio::test]
    async fn ls_allocates_dense_indices() {
        let mut nav = navigator();
        let root = nav.root();
        for i in 1..=5 {
            let handle = nav.mkdir(root, Meta::folder(format!("f{i}"), vec![])).await.unwrap();
            assert_eq!(nav.path_of(handle), format!("/{i}"));
        }
        let children = nav.ls(root).await.unwrap();
        assert_eq!(children.len(), 5);
        assert_eq!(children.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn rm_tombstones_and_is_excluded_from_ls() {
        let mut nav = navigator();
        let root = nav.root();
        nav.mkdir(root, Meta::folder("docs", vec![])).await.unwrap();
        nav.mkdir(root, Meta::folder("pics", vec![])).await.unwrap();

        nav.rm(root, 1).await.unwrap();
        let children = nav.ls(root).await.unwrap();
        assert_eq!(children.len(), 1);
        assert!(children.contains_key(&2));
        assert!(!children.contains_key(&1));
    }

    #[tokio::test]
    async fn find_matches_leaf_tags_only() {
        let mut nav = navigator();
        let root = nav.root();
        nav.mkdir(root, Meta::folder("docs", vec!["a".into()])).await.unwrap();
        let matches = nav.find(root, "a").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, "/1");
    }

    #[tokio::test]
    async fn find_skips_non_leaf_folders() {
        let mut nav = navigator();
        let root = nav.root();
        let parent = nav.mkdir(root, Meta::folder("parent", vec!["a".into()])).await.unwrap();
        nav.mkdir(parent, Meta::folder("child", vec!["a".into()])).await.unwrap();

        let matches = nav.find(root, "a").await.unwrap();
        // "parent" has a child, so it is never tested even though it is
        // tagged "a" -- only the leaf "child" matches.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, "/1/1");
    }

    #[tokio::test]
    async fn cd_and_pwd_round_trip() {
        let mut nav = navigator();
        let root = nav.root();
        nav.mkdir(root, Meta::folder("a", vec![])).await.unwrap();
        nav.mkdir(root, Meta::folder("b", vec![])).await.unwrap();
        nav.cd("/1").await.unwrap();
        assert_eq!(nav.pwd(), "/1");
        nav.cd("..").await.unwrap();
        assert_eq!(nav.pwd(), "/");
    }

    #[tokio::test]
    async fn dot_dot_resolves_to_same_place_as_direct_path() {
        let mut nav = navigator();
        let root = nav.root();
        let parent = nav.mkdir(root, Meta::folder("a", vec![])).await.unwrap();
        nav.mkdir(parent, Meta::folder("b", vec![])).await.unwrap();

        let via_dotdot = nav.resolve("/1/1/..", nav.cwd()).await.unwrap();
        let direct = nav.resolve("/1", nav.cwd()).await.unwrap();
        assert_eq!(via_dotdot, direct);
    }

    #[tokio::test]
    async fn non_numeric_segment_is_a_path_error() {
        let mut nav = navigator();
        let cwd = nav.cwd();
        assert!(matches!(
            nav.resolve("/foo", cwd).await,
            Err(CoreError::Path(_))
        ));
    }

    #[tokio::test]
    async fn cd_into_file_is_rejected() {
        let mut nav = navigator();
        let root = nav.root();
        nav.upload(root, Meta::file("x", vec![]), b"data").await.unwrap();
        assert!(matches!(nav.cd("/1").await, Err(CoreError::Path(_))));
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected_on_materialization() {
        let mut nav = navigator();
        let root = nav.root();
        nav.mkdir(root, Meta::folder("docs", vec![])).await.unwrap();

        let child_key = hd::child(&nav.arena[root].key, 1).unwrap();
        let kid = key_id(&hd::compressed_public_key(&child_key));
        let bytes = nav.store.download(&kid).await.unwrap();
        let mut keyfile = keyfile::parse(&child_key, &bytes).unwrap();
        keyfile.envelope.signature[0] ^= 0xff;
        let tampered = keyfile::serialize(&keyfile).unwrap();
        nav.store.upload(&kid, tampered).await.unwrap();

        nav.refresh(root);
        assert!(matches!(
            nav.resolve("/1", root).await,
            Err(CoreError::SignatureInvalid(_))
        ));
    }
}
