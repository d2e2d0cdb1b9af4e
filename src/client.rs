//! Thin façade over `Navigator`: `pwd`, `cd`, `ls`, `mkdir`, `upload`,
//! `download`, `rm`, `refresh`, `find`, `extended_public_key`, `id`. Plain
//! async Rust API, no IPC boundary -- the `vaultfs` CLI drives it directly.
//!
//! One `tokio::sync::Mutex` per client serializes every operation: at most
//! one in-flight navigator operation per client.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::crypto::hd::{self, Xpriv, Xpub};
use crate::error::Result;
use crate::ids::key_id;
use crate::navigator::Navigator;
use crate::node::Meta;
use crate::store::BlobStore;

/// A listed child entry: its index, logical path, and decrypted meta.
pub struct Entry {
    pub index: u32,
    pub path: String,
    pub meta: Meta,
}

pub struct Client {
    navigator: Mutex<Navigator>,
    master_pubkey: [u8; 33],
}

impl Client {
    /// Build a client rooted at `master`'s root folder key
    /// (`m/44'/0'/0'/0`), backed by `store`.
    pub fn new(master: &Xpriv, store: Arc<dyn BlobStore>, block_size: usize) -> Result<Self> {
        let root_key = hd::root_folder_key(master)?;
        let master_pubkey = hd::compressed_public_key(&root_key);
        Ok(Self {
            navigator: Mutex::new(Navigator::new(root_key, store, block_size)),
            master_pubkey,
        })
    }

    /// Hex `key-id` of the root folder key's public key -- the "master"
    /// public key the rest of the protocol means (the already-derived
    /// `m/44'/0'/0'/0` key, not the raw pre-path BIP32 master) -- the
    /// opaque session handle a collaborator host uses to route requests.
    pub fn id(&self) -> String {
        key_id(&self.master_pubkey)
    }

    pub async fn pwd(&self) -> String {
        self.navigator.lock().await.pwd()
    }

    pub async fn cd(&self, path: &str) -> Result<()> {
        self.navigator.lock().await.cd(path).await
    }

    pub async fn ls(&self, path: &str) -> Result<Vec<Entry>> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let folder = nav.resolve(path, cwd).await?;
        let children = nav.ls(folder).await?;
        Ok(children
            .into_iter()
            .map(|(index, handle)| Entry {
                index,
                path: nav.path_of(handle),
                meta: nav.meta_of(handle).expect("listed child is materialized"),
            })
            .collect())
    }

    pub async fn mkdir(&self, parent_path: &str, name: &str, tags: Vec<String>) -> Result<String> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let parent = nav.resolve(parent_path, cwd).await?;
        let handle = nav.mkdir(parent, Meta::folder(name, tags)).await?;
        Ok(nav.path_of(handle))
    }

    pub async fn upload(
        &self,
        parent_path: &str,
        name: &str,
        data: Vec<u8>,
        tags: Vec<String>,
    ) -> Result<String> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let parent = nav.resolve(parent_path, cwd).await?;
        let handle = nav.upload(parent, Meta::file(name, tags), &data).await?;
        Ok(nav.path_of(handle))
    }

    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let handle = nav.resolve(path, cwd).await?;
        nav.download(handle).await
    }

    pub async fn rm(&self, path: &str) -> Result<()> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let (parent, index) = nav.resolve_parent(path, cwd).await?;
        nav.rm(parent, index).await
    }

    pub async fn refresh(&self, path: &str) -> Result<()> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let folder = nav.resolve(path, cwd).await?;
        nav.refresh(folder);
        Ok(())
    }

    pub async fn find(&self, path: &str, query: &str) -> Result<Vec<(String, Meta)>> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let start = nav.resolve(path, cwd).await?;
        nav.find(start, query).await
    }

    /// Neutered (public-only) BIP32 xpub of `path`'s folder key -- a
    /// shareable read-only capability to that subtree.
    pub async fn extended_public_key(&self, path: &str) -> Result<Xpub> {
        let mut nav = self.navigator.lock().await;
        let cwd = nav.cwd();
        let handle = nav.resolve(path, cwd).await?;
        Ok(nav.extended_public_key(handle))
    }
}
