//! Content-addressed blob storage.
//!
//! The proxy only needs two operations from a blob network: store some
//! bytes and get back an identifier, and fetch bytes by that identifier.
//! Key bundles and whole-file ciphertexts both go through [`BlobStore`].

mod local;
mod vault;

use async_trait::async_trait;
use bytes::Bytes;

pub use local::LocalBlobStore;
pub use vault::{KeyBundle, KeyVault, VaultError, KEY_BUNDLE_VERSION};

use crate::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("invalid blob identifier: {0}")]
    InvalidId(String),
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

impl Classify for BlobStoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            BlobStoreError::NotFound(_) => ErrorKind::NotFound,
            BlobStoreError::InvalidId(_) => ErrorKind::Validation,
            BlobStoreError::Unavailable(_) => ErrorKind::Storage,
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Persist `bytes`, returning their content identifier.
    async fn put(&self, bytes: Vec<u8>) -> Result<String, BlobStoreError>;

    /// Fetch the bytes stored under `id`.
    async fn get(&self, id: &str) -> Result<Bytes, BlobStoreError>;
}
