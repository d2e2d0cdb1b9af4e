//! Interactive REPL exercising the client surface.
//!
//! A line-oriented command loop over [`vaultfs_core::Client`], with `clap`
//! wired up to parse mnemonic/passphrase/store arguments and `env_logger`
//! initialized from the usual `RUST_LOG` environment variable.

use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;

use vaultfs_core::crypto::{self, hd};
use vaultfs_core::store::{BlobStore, DiskBlobStore, MemoryBlobStore};
use vaultfs_core::{Client, CoreError};

/// Encrypted, content-addressed vault navigator.
#[derive(Parser, Debug)]
#[command(name = "vaultfs", about = "Encrypted content-addressed vault navigator")]
struct Args {
    /// BIP39 mnemonic phrase (quoted). A fresh one is generated if unset.
    #[arg(long, env = "VAULTFS_MNEMONIC")]
    mnemonic: Option<String>,

    /// BIP39 passphrase.
    #[arg(long, env = "VAULTFS_PASSPHRASE", default_value = "")]
    passphrase: String,

    /// Blob store backend: "memory", or a directory path for an on-disk store.
    #[arg(long, env = "VAULTFS_STORE", default_value = "memory")]
    store: String,

    /// Block size in bytes for the block codec.
    #[arg(long, env = "VAULTFS_BLOCK_SIZE", default_value_t = 4096)]
    block_size: usize,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    log::info!("vaultfs starting...");

    let args = Args::parse();

    let mnemonic = match &args.mnemonic {
        Some(phrase) => phrase.clone(),
        None => {
            let generated = crypto::generate_mnemonic().expect("mnemonic generation failed");
            let phrase = generated.to_string();
            log::warn!("no mnemonic supplied -- generated a fresh one, save it: {phrase}");
            phrase
        }
    };

    let seed =
        crypto::seed_from_mnemonic(&mnemonic, &args.passphrase).expect("invalid mnemonic phrase");
    let master = hd::master_key(&seed).expect("master key derivation failed");

    let store: Arc<dyn BlobStore> = if args.store == "memory" {
        Arc::new(MemoryBlobStore::new())
    } else {
        Arc::new(DiskBlobStore::new(args.store.clone()))
    };

    let client = Client::new(&master, store, args.block_size).expect("client init failed");
    log::info!("vaultfs ready, session id {}", client.id());

    run_repl(&client).await;
}

async fn run_repl(client: &Client) {
    let stdin = io::stdin();
    loop {
        print!("{} $ ", client.pwd().await);
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if let Err(e) = dispatch(client, &parts).await {
            println!("error: {e}");
        }
    }
}

fn arg<'a>(parts: &[&'a str], index: usize) -> Result<&'a str, CoreError> {
    parts
        .get(index)
        .copied()
        .ok_or_else(|| CoreError::Path("missing argument".into()))
}

async fn dispatch(client: &Client, parts: &[&str]) -> Result<(), CoreError> {
    match parts.first().copied().unwrap_or("") {
        "exit" | "quit" => std::process::exit(0),
        "pwd" => println!("{}", client.pwd().await),
        "cd" => client.cd(arg(parts, 1)?).await?,
        "ls" => print_entries(client, parts.get(1).copied().unwrap_or(".")).await?,
        "mkdir" => {
            let path = arg(parts, 1)?;
            let name = arg(parts, 2)?;
            let tags = parts.get(3..).unwrap_or(&[]).iter().map(|s| s.to_string()).collect();
            println!("{}", client.mkdir(path, name, tags).await?);
        }
        "upload" => {
            let parent = arg(parts, 1)?;
            let name = arg(parts, 2)?;
            let local_path = arg(parts, 3)?;
            let data = std::fs::read(local_path).map_err(|e| CoreError::Io(Box::new(e)))?;
            println!("{}", client.upload(parent, name, data, vec![]).await?);
        }
        "download" => {
            let path = arg(parts, 1)?;
            let local_path = arg(parts, 2)?;
            let data = client.download(path).await?;
            std::fs::write(local_path, data).map_err(|e| CoreError::Io(Box::new(e)))?;
            println!("downloaded {path} -> {local_path}");
        }
        "rm" => client.rm(arg(parts, 1)?).await?,
        "refresh" => client.refresh(arg(parts, 1)?).await?,
        "find" => {
            let path = arg(parts, 1)?;
            let query = arg(parts, 2)?;
            for (entry_path, meta) in client.find(path, query).await? {
                println!("{entry_path}\t{}", meta.name);
            }
        }
        "publickey" => {
            let path = arg(parts, 1)?;
            println!("{}", client.extended_public_key(path).await?);
        }
        "id" => println!("{}", client.id()),
        other => println!("unrecognized command: {other}"),
    }
    Ok(())
}

async fn print_entries(client: &Client, path: &str) -> Result<(), CoreError> {
    for entry in client.ls(path).await? {
        println!("{}\t{}\t{}", entry.index, entry.meta.node_type, entry.meta.name);
    }
    Ok(())
}
