use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::chain::ChainState;
use common::cipher::{CipherError, ChunkedCipher};
use common::crypto::SealKey;
use common::gate::AccessGate;
use common::jobs::{JobDispatcher, JobReceiver};
use common::store::{BlobStore, KeyVault};

use crate::blobs::{setup_blob_store, BlobsSetupError};
use crate::file_jobs::FileJobs;
use crate::service_config::Config;
use crate::solana::SolanaRpc;

/// Main service state, shared by every handler
#[derive(Clone)]
pub struct State {
    gate: AccessGate,
    blobs: Arc<dyn BlobStore>,
    jobs: FileJobs,
    dispatcher: JobDispatcher,
    cipher: ChunkedCipher,
    work_dir: PathBuf,
}

impl State {
    /// Assemble state from its collaborators. The caller owns the returned
    /// receiver and must run a worker over it for whole-file jobs to progress.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        chain: Arc<dyn ChainState>,
        seal_key: SealKey,
        challenge: impl Into<String>,
        cipher: ChunkedCipher,
        work_dir: PathBuf,
    ) -> (Self, JobReceiver) {
        let vault = KeyVault::new(blobs.clone(), seal_key);
        let gate = AccessGate::new(vault, chain, challenge);
        let (dispatcher, receiver) = JobDispatcher::new();
        let state = Self {
            gate,
            blobs,
            jobs: FileJobs::default(),
            dispatcher,
            cipher,
            work_dir,
        };
        (state, receiver)
    }

    /// Build state from service config. Like [`new`](Self::new), the
    /// receiver is returned for the caller to run a worker over.
    pub async fn from_config(config: &Config) -> Result<(Self, JobReceiver), StateSetupError> {
        // 1. Setup blob store
        tracing::debug!("ServiceState::from_config - loading blob store");
        let blobs = setup_blob_store(
            &config.blob_store,
            &config.blobs_path,
            config.web3_token.as_deref(),
        )
        .await?;

        // 2. Setup chain reader
        tracing::info!(rpc = %config.rpc_url, "Using Solana RPC");
        let chain = SolanaRpc::new(config.rpc_url.clone())
            .map_err(|e| StateSetupError::Chain(e.to_string()))?;

        // 3. Validate the cipher before accepting any uploads
        let cipher = ChunkedCipher::new(config.chunk_size, config.workers)?;

        std::fs::create_dir_all(&config.work_dir)
            .map_err(|e| StateSetupError::WorkDir(e.to_string()))?;

        Ok(Self::new(
            blobs,
            Arc::new(chain),
            config.seal_key.clone(),
            config.challenge.clone(),
            cipher,
            config.work_dir.clone(),
        ))
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn jobs(&self) -> &FileJobs {
        &self.jobs
    }

    pub fn dispatcher(&self) -> &JobDispatcher {
        &self.dispatcher
    }

    pub fn cipher(&self) -> ChunkedCipher {
        self.cipher
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobsSetupError),
    #[error("Chain client error: {0}")]
    Chain(String),
    #[error("Invalid cipher configuration: {0}")]
    Cipher(#[from] CipherError),
    #[error("Work directory error: {0}")]
    WorkDir(String),
}
