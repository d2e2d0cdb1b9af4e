//! End-to-end scenario tests driven entirely through `vaultfs_core::Client`
//! against `MemoryBlobStore`.
//!
//! Unlike the unit tests colocated with `client.rs` and `navigator.rs`
//! (which use raw seed bytes for brevity), these start from the standard
//! BIP39 test vector.

use std::sync::Arc;

use vaultfs_core::{CoreError, MemoryBlobStore};
use vaultfs_core::crypto::{hd, seed_from_mnemonic};
use vaultfs_core::Client;

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn client(block_size: usize) -> Client {
    let seed = seed_from_mnemonic(TEST_MNEMONIC, "").unwrap();
    let master = hd::master_key(&seed).unwrap();
    Client::new(&master, Arc::new(MemoryBlobStore::new()), block_size).unwrap()
}

#[tokio::test]
async fn scenario_1_create_root_mkdir_ls() {
    let client = client(16);
    let path = client.mkdir("/", "docs", vec!["a".into()]).await.unwrap();
    assert_eq!(path, "/1");

    let entries = client.ls("/").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].index, 1);
    assert_eq!(entries[0].meta.name, "docs");
    assert_eq!(entries[0].meta.node_type, "folder");
    assert_eq!(entries[0].meta.tags, vec!["a".to_string()]);
}

#[tokio::test]
async fn scenario_2_upload_download_round_trip() {
    let client = client(16);
    client.mkdir("/", "docs", vec!["a".into()]).await.unwrap();

    let path = client
        .upload("/", "x", b"HelloWorld!!".to_vec(), vec![])
        .await
        .unwrap();
    assert_eq!(path, "/2");

    let data = client.download("/2").await.unwrap();
    assert_eq!(data, b"HelloWorld!!");
}

#[tokio::test]
async fn scenario_3_tombstone_hides_removed_index() {
    let client = client(16);
    client.mkdir("/", "docs", vec!["a".into()]).await.unwrap();
    assert_eq!(client.ls("/").await.unwrap().len(), 1);

    client.rm("/1").await.unwrap();

    let entries = client.ls("/").await.unwrap();
    assert!(entries.iter().all(|e| e.index != 1));
    assert!(entries.is_empty());
}

#[tokio::test]
async fn scenario_4_tag_search() {
    let client = client(16);
    client.mkdir("/", "docs", vec!["a".into()]).await.unwrap();

    let matches = client.find("/", "a").await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].0, "/1");
    assert_eq!(matches[0].1.name, "docs");
    assert_eq!(matches[0].1.tags, vec!["a".to_string()]);
    assert_eq!(matches[0].1.node_type, "folder");
}

#[tokio::test]
async fn scenario_5_signature_forgery_is_rejected() {
    use vaultfs_core::store::BlobStore;

    let store = Arc::new(MemoryBlobStore::new());
    let seed = seed_from_mnemonic(TEST_MNEMONIC, "").unwrap();
    let master = hd::master_key(&seed).unwrap();
    let client = Client::new(&master, store.clone(), 16).unwrap();

    client.mkdir("/", "docs", vec![]).await.unwrap();

    let root = hd::root_folder_key(&master).unwrap();
    let node = hd::child(&root, 1).unwrap();
    let key_id = vaultfs_core::ids::key_id(&hd::compressed_public_key(&node));

    let bytes = store.download(&key_id).await.unwrap();
    let mut keyfile = vaultfs_core::keyfile::parse(&node, &bytes).unwrap();
    keyfile.envelope.signature[0] ^= 0xFF;
    let forged = vaultfs_core::keyfile::serialize(&keyfile).unwrap();
    store.upload(&key_id, forged).await.unwrap();

    client.refresh("/").await.unwrap();
    let err = client.ls("/").await.unwrap_err();
    assert!(matches!(err, CoreError::SignatureInvalid(_)));
}

#[tokio::test]
async fn scenario_6_path_parsing() {
    let client = client(16);
    client.mkdir("/", "a", vec![]).await.unwrap();
    client.mkdir("/1", "b", vec![]).await.unwrap();

    client.cd("/1/2/..").await.unwrap();
    assert_eq!(client.pwd().await, "/1");

    let via_direct = {
        let direct = client(16);
        direct.mkdir("/", "a", vec![]).await.unwrap();
        direct.mkdir("/1", "b", vec![]).await.unwrap();
        direct.cd("/1").await.unwrap();
        direct.pwd().await
    };
    assert_eq!(client.pwd().await, via_direct);

    assert!(matches!(
        client.cd("/foo").await.unwrap_err(),
        CoreError::Path(_)
    ));
}

#[tokio::test]
async fn refresh_is_idempotent_on_an_unchanged_store() {
    let client = client(16);
    client.mkdir("/", "docs", vec!["a".into()]).await.unwrap();

    let before = client.ls("/").await.unwrap();
    client.refresh("/").await.unwrap();
    let after = client.ls("/").await.unwrap();

    assert_eq!(before.len(), after.len());
    assert_eq!(before[0].path, after[0].path);
    assert_eq!(before[0].meta.name, after[0].meta.name);
}
