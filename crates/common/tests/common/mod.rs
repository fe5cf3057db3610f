//! Shared test utilities for access flow integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use common::cipher::{ChunkedCipher, RecryptionKeys};
use common::crypto::{SealKey, SecretKey};
use common::gate::{AccessGate, DEFAULT_CHALLENGE};
use common::store::{KeyBundle, KeyVault, LocalBlobStore, KEY_BUNDLE_VERSION};
use common::testkit::MemoryChain;
use tempfile::TempDir;

pub const MINT: &str = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr";

/// A proxy wired to a filesystem blob store and an in-memory chain
pub struct TestProxy {
    pub gate: AccessGate,
    pub blobs: Arc<LocalBlobStore>,
    pub chain: Arc<MemoryChain>,
    pub dir: TempDir,
}

/// Route gate traces to the test output. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn setup_proxy() -> TestProxy {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let blobs = Arc::new(LocalBlobStore::fs(&dir.path().join("blobs")).await.unwrap());
    let vault = KeyVault::new(blobs.clone(), SealKey::generate().unwrap());
    let chain = Arc::new(MemoryChain::default());
    let gate = AccessGate::new(vault, chain.clone(), DEFAULT_CHALLENGE);
    TestProxy {
        gate,
        blobs,
        chain,
        dir,
    }
}

/// What an owner keeps after encrypting and publishing a file.
pub struct Published {
    pub owner: SecretKey,
    pub ciphertext: Vec<u8>,
    pub key_cid: String,
    pub chunks: usize,
}

/// Encrypt `plaintext` under a fresh owner key and store its key bundle.
pub async fn publish(
    proxy: &TestProxy,
    cipher: &ChunkedCipher,
    plaintext: &[u8],
    file_cid: &str,
) -> Published {
    let owner = SecretKey::generate();
    let mut ciphertext = Vec::new();
    let capsules = cipher
        .encrypt(&owner.public(), Cursor::new(plaintext), &mut ciphertext)
        .unwrap();
    let chunks = capsules.len();

    let bundle = KeyBundle {
        version: KEY_BUNDLE_VERSION,
        recryption_keys: RecryptionKeys::new(&owner, &capsules, cipher.chunk_size()).unwrap(),
        mint: MINT.to_string(),
        file_cid: file_cid.to_string(),
        file_name: "hello".to_string(),
        file_extension: "txt".to_string(),
    };
    let key_cid = proxy.gate.vault().store(&bundle).await.unwrap();

    Published {
        owner,
        ciphertext,
        key_cid,
        chunks,
    }
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}
