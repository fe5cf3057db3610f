use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use common::crypto::SealKey;

use crate::state::{AppState, BlobStoreConfig};

/// Everything the service needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // blob store configuration
    /// Blob storage backend configuration
    pub blob_store: BlobStoreConfig,
    /// Path for the local iroh-blobs store
    pub blobs_path: PathBuf,
    /// Bearer token for the web3 backend, if that backend is selected
    pub web3_token: Option<String>,

    // key handling
    /// Proxy secret that seals key bundles at rest
    pub seal_key: SealKey,
    /// Message requesters sign to prove wallet ownership
    pub challenge: String,

    // chain
    pub rpc_url: Url,

    // whole-file jobs
    /// Scratch space for uploads, ciphertexts and results
    pub work_dir: PathBuf,
    pub chunk_size: usize,
    pub workers: usize,
    /// How long finished jobs and their results are kept
    pub job_ttl: Duration,

    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Service config from an initialized state directory.
    pub fn from_app_state(state: &AppState, seal_key: SealKey) -> Self {
        Self {
            blob_store: state.config.blob_store.clone(),
            blobs_path: state.blobs_path.clone(),
            web3_token: None,
            seal_key,
            challenge: state.config.challenge.clone(),
            rpc_url: state.config.rpc_url.clone(),
            work_dir: state.work_dir.clone(),
            chunk_size: state.config.chunk_size,
            workers: state.config.workers,
            job_ttl: Duration::from_secs(state.config.job_ttl_secs),
            api_port: state.config.api_port,
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
