//! Blob store setup logic.

use std::path::Path;
use std::sync::Arc;

use common::store::{BlobStore, LocalBlobStore};

use crate::state::BlobStoreConfig;

use super::{BlobsSetupError, Web3BlobStore};

/// Setup the blob store based on configuration.
///
/// Supports three modes:
/// - Local: iroh-blobs FsStore under the state directory (default)
/// - Memory: iroh-blobs in-memory store, for tests and throwaway runs
/// - Web3: web3.storage uploads, reads through an IPFS gateway
pub async fn setup_blob_store(
    config: &BlobStoreConfig,
    blobs_path: &Path,
    web3_token: Option<&str>,
) -> Result<Arc<dyn BlobStore>, BlobsSetupError> {
    match config {
        BlobStoreConfig::Local => {
            tracing::info!(path = %blobs_path.display(), "Using local iroh blob store");
            let store = LocalBlobStore::fs(blobs_path)
                .await
                .map_err(|e| BlobsSetupError::StoreError(e.to_string()))?;
            Ok(Arc::new(store))
        }

        BlobStoreConfig::Memory => {
            tracing::warn!("Using in-memory blob store, stored keys are lost on restart");
            Ok(Arc::new(LocalBlobStore::memory()))
        }

        BlobStoreConfig::Web3 {
            api_url,
            gateway_url,
        } => {
            let token = web3_token.ok_or(BlobsSetupError::MissingToken)?;
            tracing::info!(api = %api_url, gateway = %gateway_url, "Using web3.storage blob store");
            let store = Web3BlobStore::new(api_url.clone(), gateway_url.clone(), token.to_string())
                .map_err(|e| BlobsSetupError::StoreError(e.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}
