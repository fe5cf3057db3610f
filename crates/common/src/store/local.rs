use std::future::IntoFuture;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use iroh_blobs::{
    api::blobs::{BlobStatus, Blobs},
    store::{fs::FsStore, mem::MemStore},
    BlobsProtocol, Hash,
};

use super::{BlobStore, BlobStoreError};

/// Blob store over a local iroh-blobs store, addressed by BLAKE3 hash.
///
/// Used when the daemon runs without a public network behind it, and by
/// tests.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    inner: Arc<BlobsProtocol>,
}

impl LocalBlobStore {
    /// Load (or create) a filesystem backed store at `path`.
    pub async fn fs(path: &Path) -> Result<Self, BlobStoreError> {
        tracing::debug!(path = %path.display(), "loading local blob store");
        let store = FsStore::load(path)
            .await
            .map_err(|e| BlobStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(BlobsProtocol::new(&store, None)),
        })
    }

    /// An in-memory store, lost on drop.
    pub fn memory() -> Self {
        let store = MemStore::new();
        Self {
            inner: Arc::new(BlobsProtocol::new(&store, None)),
        }
    }

    fn blobs(&self) -> &Blobs {
        self.inner.store().blobs()
    }

    fn parse(id: &str) -> Result<Hash, BlobStoreError> {
        Hash::from_str(id).map_err(|e| BlobStoreError::InvalidId(format!("{}: {}", id, e)))
    }

    /// Whether the blob is fully present.
    pub async fn has(&self, hash: &Hash) -> Result<bool, BlobStoreError> {
        let status = self
            .blobs()
            .status(*hash)
            .await
            .map_err(|e| BlobStoreError::Unavailable(e.to_string()))?;
        Ok(matches!(status, BlobStatus::Complete { .. }))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, BlobStoreError> {
        let size = bytes.len();
        let hash = self
            .blobs()
            .add_bytes(bytes)
            .into_future()
            .await
            .map_err(|e| BlobStoreError::Unavailable(e.to_string()))?
            .hash;
        tracing::debug!(%hash, size, "stored blob");
        Ok(hash.to_string())
    }

    async fn get(&self, id: &str) -> Result<Bytes, BlobStoreError> {
        let hash = Self::parse(id)?;
        if !self.has(&hash).await? {
            return Err(BlobStoreError::NotFound(id.to_string()));
        }
        self.blobs()
            .get_bytes(hash)
            .await
            .map_err(|e| BlobStoreError::Unavailable(e.to_string()))
    }
}
