use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cipher::RecryptionKeys;
use crate::crypto::{SealError, SealKey};
use crate::error::{Classify, ErrorKind};

use super::{BlobStore, BlobStoreError};

pub const KEY_BUNDLE_VERSION: u32 = 0;

/// Everything the proxy persists for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBundle {
    #[serde(default)]
    pub version: u32,
    pub recryption_keys: RecryptionKeys,
    /// Token mint whose holders may request keys.
    pub mint: String,
    pub file_cid: String,
    pub file_name: String,
    pub file_extension: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error(transparent)]
    Store(#[from] BlobStoreError),
    #[error("blob is not a key bundle sealed by this proxy: {0}")]
    Seal(#[from] SealError),
    #[error("key bundle encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("unsupported key bundle version {0}")]
    Version(u32),
}

impl Classify for VaultError {
    fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Store(e) => e.kind(),
            VaultError::Seal(_) | VaultError::Encoding(_) | VaultError::Version(_) => {
                ErrorKind::Validation
            }
        }
    }
}

/// Seals key bundles with the proxy's key before they reach the blob store,
/// and opens them on the way back.
#[derive(Debug, Clone)]
pub struct KeyVault {
    blobs: Arc<dyn BlobStore>,
    seal: SealKey,
}

impl KeyVault {
    pub fn new(blobs: Arc<dyn BlobStore>, seal: SealKey) -> Self {
        Self { blobs, seal }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub async fn store(&self, bundle: &KeyBundle) -> Result<String, VaultError> {
        let json = serde_json::to_vec(bundle)?;
        let sealed = self.seal.seal(&json)?;
        let cid = self.blobs.put(sealed).await?;
        tracing::info!(key_cid = %cid, file_cid = %bundle.file_cid, "stored key bundle");
        Ok(cid)
    }

    pub async fn load(&self, cid: &str) -> Result<KeyBundle, VaultError> {
        let sealed = self.blobs.get(cid).await?;
        let json = self.seal.open(&sealed)?;
        let bundle: KeyBundle = serde_json::from_slice(&json)?;
        if bundle.version != KEY_BUNDLE_VERSION {
            return Err(VaultError::Version(bundle.version));
        }
        Ok(bundle)
    }
}
