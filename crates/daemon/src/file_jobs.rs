//! Worker for whole-file store and request jobs.
//!
//! These flows hand plaintext to the proxy: uploads arrive unencrypted and
//! requests are decrypted here on the requester's behalf. The key-only
//! endpoints never do either.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use uuid::Uuid;

use common::cipher::{CipherError, RecryptionKeys};
use common::codec::CodecError;
use common::crypto::SecretKey;
use common::error::{Classify, ErrorKind};
use common::gate::{AccessRequest, GateError};
use common::jobs::{Job, JobRegistry};
use common::store::{BlobStoreError, KeyBundle, VaultError, KEY_BUNDLE_VERSION};

use crate::ServiceState;

pub const UPLOAD_FILE_NAME: &str = "plaintext.bin";
const CIPHER_FILE_NAME: &str = "cipher.bin";
const RESULT_FILE_NAME: &str = "result.bin";

/// How long finished jobs and their decrypted results are kept.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Result recorded for a finished job
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Stored {
        file_cid: String,
        key_cid: String,
    },
    Decrypted {
        path: PathBuf,
        file_name: String,
        file_extension: String,
    },
}

pub type FileJobs = JobRegistry<FileOutcome>;

#[derive(Debug, thiserror::Error)]
pub enum FileJobError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Blobs(#[from] BlobStoreError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cipher task failed: {0}")]
    Task(String),
}

impl Classify for FileJobError {
    fn kind(&self) -> ErrorKind {
        match self {
            FileJobError::Gate(e) => e.kind(),
            FileJobError::Vault(e) => e.kind(),
            FileJobError::Blobs(e) => e.kind(),
            FileJobError::Cipher(e) => e.kind(),
            FileJobError::Codec(e) => e.kind(),
            FileJobError::Io(_) | FileJobError::Task(_) => ErrorKind::Internal,
        }
    }
}

/// Scratch directory for one job.
pub fn job_dir(work_dir: &Path, id: Uuid) -> PathBuf {
    work_dir.join(id.simple().to_string())
}

/// Drain the job queue until shutdown is signalled or the queue closes.
///
/// A job already running is finished before the worker stops.
pub async fn run_worker(
    state: ServiceState,
    mut job_stream: flume::r#async::RecvStream<'static, Job>,
    mut shutdown_rx: watch::Receiver<()>,
) {
    use futures::StreamExt;

    tracing::info!("Starting whole-file job worker");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                tracing::info!("Shutdown signal received, stopping job worker");
                break;
            }
            job = job_stream.next() => match job {
                Some(job) => execute_job(&state, job).await,
                None => {
                    tracing::info!("Job queue closed, shutting down worker");
                    break;
                }
            },
        }
    }
}

/// Evict jobs that finished more than `ttl` ago and delete what they left
/// in the work directory. Returns the evicted ids.
pub async fn sweep_expired(state: &ServiceState, ttl: Duration) -> Vec<Uuid> {
    let Some(cutoff) = Instant::now().checked_sub(ttl) else {
        return Vec::new();
    };
    let evicted = state.jobs().evict_finished_before(cutoff);
    for id in &evicted {
        let dir = job_dir(state.work_dir(), *id);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(job_id = %id, "failed to remove expired job dir: {}", e);
            }
        }
    }
    if !evicted.is_empty() {
        tracing::debug!(count = evicted.len(), "evicted expired jobs");
    }
    evicted
}

/// Periodically sweep expired jobs until shutdown.
pub async fn run_sweeper(state: ServiceState, ttl: Duration, mut shutdown_rx: watch::Receiver<()>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL.min(ttl.max(Duration::from_secs(1))));
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = interval.tick() => {
                sweep_expired(&state, ttl).await;
            }
        }
    }
}

pub async fn execute_job(state: &ServiceState, job: Job) {
    let id = job.id();
    let dir = job_dir(state.work_dir(), id);

    let result = match job {
        Job::StoreFile {
            upload,
            mint,
            file_name,
            file_extension,
            ..
        } => store_file(state, &dir, &upload, mint, file_name, file_extension).await,
        Job::RequestFile { access, .. } => request_file(state, &dir, &access).await,
    };

    let recorded = match result {
        Ok(outcome) => {
            tracing::info!(job_id = %id, "job finished");
            state.jobs().complete(id, outcome)
        }
        Err(e) => {
            tracing::error!(job_id = %id, kind = %e.kind(), "job failed: {}", e);
            // Nothing partial survives a failed job
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(job_id = %id, "failed to clean up job dir: {}", e);
                }
            }
            state.jobs().fail(id, e.kind(), short_message(&e))
        }
    };
    if let Err(e) = recorded {
        tracing::error!(job_id = %id, "failed to record job outcome: {}", e);
    }
}

/// Message a polling client sees. Internal failures stay in the log.
fn short_message(err: &FileJobError) -> String {
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        _ => err.to_string(),
    }
}

async fn store_file(
    state: &ServiceState,
    dir: &Path,
    upload: &Path,
    mint: String,
    file_name: String,
    file_extension: String,
) -> Result<FileOutcome, FileJobError> {
    let cipher = state.cipher();
    let owner = SecretKey::generate();
    let owner_public = owner.public();
    let plaintext = upload.to_path_buf();
    let ciphertext = dir.join(CIPHER_FILE_NAME);

    tracing::debug!(upload = %upload.display(), "encrypting upload");
    let capsules = {
        let ciphertext = ciphertext.clone();
        tokio::task::spawn_blocking(move || {
            cipher.encrypt_file(&owner_public, &plaintext, &ciphertext)
        })
        .await
        .map_err(|e| FileJobError::Task(e.to_string()))??
    };

    let bytes = tokio::fs::read(&ciphertext).await?;
    let file_cid = state.blobs().put(bytes).await?;
    tracing::info!(%file_cid, chunks = capsules.len(), "published ciphertext");

    let bundle = KeyBundle {
        version: KEY_BUNDLE_VERSION,
        recryption_keys: RecryptionKeys::new(&owner, &capsules, cipher.chunk_size())?,
        mint,
        file_cid: file_cid.clone(),
        file_name,
        file_extension,
    };
    let key_cid = state.gate().vault().store(&bundle).await?;

    tokio::fs::remove_dir_all(dir).await?;
    Ok(FileOutcome::Stored { file_cid, key_cid })
}

async fn request_file(
    state: &ServiceState,
    dir: &Path,
    access: &AccessRequest,
) -> Result<FileOutcome, FileJobError> {
    // One-shot receiver key, dropped with the job
    let receiver = SecretKey::generate();
    let release = state
        .gate()
        .request_keys(access, &receiver.public())
        .await?;

    let bytes = state.blobs().get(&release.file_cid).await?;
    tokio::fs::create_dir_all(dir).await?;
    let ciphertext = dir.join(CIPHER_FILE_NAME);
    tokio::fs::write(&ciphertext, &bytes).await?;

    let result = dir.join(RESULT_FILE_NAME);
    let cipher = state.cipher();
    let keys = release.decryption_keys;
    {
        let ciphertext = ciphertext.clone();
        let result = result.clone();
        tokio::task::spawn_blocking(move || {
            cipher.decrypt_file(&keys, &receiver, &ciphertext, &result)
        })
        .await
        .map_err(|e| FileJobError::Task(e.to_string()))??;
    }
    tokio::fs::remove_file(&ciphertext).await?;

    Ok(FileOutcome::Decrypted {
        path: result,
        file_name: release.file_name,
        file_extension: release.file_extension,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::cipher::ChunkedCipher;
    use common::crypto::SealKey;
    use common::gate::DEFAULT_CHALLENGE;
    use common::jobs::{JobError, JobStatus};
    use common::store::LocalBlobStore;
    use common::testkit::{MemoryChain, TestWallet};
    use tempfile::TempDir;

    use super::*;

    const MINT: &str = "mint";

    fn state(dir: &TempDir) -> (ServiceState, Arc<MemoryChain>) {
        let chain = Arc::new(MemoryChain::default());
        let (state, _receiver) = ServiceState::new(
            Arc::new(LocalBlobStore::memory()),
            chain.clone(),
            SealKey::generate().unwrap(),
            DEFAULT_CHALLENGE,
            ChunkedCipher::new(16, 2).unwrap(),
            dir.path().to_path_buf(),
        );
        (state, chain)
    }

    async fn stage_upload(state: &ServiceState, data: &[u8]) -> (Uuid, PathBuf) {
        let id = state.jobs().register();
        let dir = job_dir(state.work_dir(), id);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let upload = dir.join(UPLOAD_FILE_NAME);
        tokio::fs::write(&upload, data).await.unwrap();
        (id, upload)
    }

    async fn store(state: &ServiceState, data: &[u8]) -> (String, String) {
        let (id, upload) = stage_upload(state, data).await;
        execute_job(
            state,
            Job::StoreFile {
                id,
                upload,
                mint: MINT.into(),
                file_name: "notes".into(),
                file_extension: "md".into(),
            },
        )
        .await;
        match state.jobs().outcome(id).unwrap() {
            FileOutcome::Stored { file_cid, key_cid } => (file_cid, key_cid),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_store_then_request_round_trip() {
        let dir = TempDir::new().unwrap();
        let (state, chain) = state(&dir);
        let data: Vec<u8> = (0..100u8).collect();

        let (_, key_cid) = store(&state, &data).await;

        let wallet = TestWallet::generate();
        chain.set_balance(&wallet.public(), MINT, 1);
        let id = state.jobs().register();
        let access = AccessRequest::new(
            key_cid,
            wallet.public().as_bytes(),
            wallet.sign(DEFAULT_CHALLENGE.as_bytes()),
        )
        .unwrap();
        execute_job(&state, Job::RequestFile { id, access }).await;

        match state.jobs().outcome(id).unwrap() {
            FileOutcome::Decrypted {
                path,
                file_name,
                file_extension,
            } => {
                assert_eq!(file_name, "notes");
                assert_eq!(file_extension, "md");
                assert_eq!(tokio::fs::read(path).await.unwrap(), data);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_store_cleans_up_work_dir() {
        let dir = TempDir::new().unwrap();
        let (state, _) = state(&dir);
        let (id, upload) = stage_upload(&state, b"hello").await;
        execute_job(
            &state,
            Job::StoreFile {
                id,
                upload,
                mint: MINT.into(),
                file_name: "a".into(),
                file_extension: "txt".into(),
            },
        )
        .await;
        assert_eq!(state.jobs().status(id).unwrap(), JobStatus::Ready);
        assert!(!job_dir(state.work_dir(), id).exists());
    }

    #[tokio::test]
    async fn test_denied_request_fails_job() {
        let dir = TempDir::new().unwrap();
        let (state, _) = state(&dir);
        let (_, key_cid) = store(&state, b"secret").await;

        let wallet = TestWallet::generate();
        let id = state.jobs().register();
        let access = AccessRequest::new(
            key_cid,
            wallet.public().as_bytes(),
            wallet.sign(DEFAULT_CHALLENGE.as_bytes()),
        )
        .unwrap();
        execute_job(&state, Job::RequestFile { id, access }).await;

        assert_eq!(state.jobs().status(id).unwrap(), JobStatus::Failed);
        match state.jobs().outcome(id) {
            Err(JobError::Failed { kind, .. }) => assert_eq!(kind, ErrorKind::AccessDenied),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!job_dir(state.work_dir(), id).exists());
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_results() {
        let dir = TempDir::new().unwrap();
        let (state, chain) = state(&dir);
        let (_, key_cid) = store(&state, b"plaintext on disk").await;

        let wallet = TestWallet::generate();
        chain.set_balance(&wallet.public(), MINT, 1);
        let id = state.jobs().register();
        let access = AccessRequest::new(
            key_cid,
            wallet.public().as_bytes(),
            wallet.sign(DEFAULT_CHALLENGE.as_bytes()),
        )
        .unwrap();
        execute_job(&state, Job::RequestFile { id, access }).await;
        let result = match state.jobs().outcome(id).unwrap() {
            FileOutcome::Decrypted { path, .. } => path,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert!(result.exists());
        let pending = state.jobs().register();

        // Not yet expired
        assert!(sweep_expired(&state, DEFAULT_JOB_TTL).await.is_empty());
        assert!(result.exists());

        let evicted = sweep_expired(&state, Duration::ZERO).await;
        assert!(evicted.contains(&id));
        assert!(!result.exists());
        assert!(!job_dir(state.work_dir(), id).exists());
        assert!(matches!(state.jobs().status(id), Err(JobError::NotFound(_))));
        assert_eq!(state.jobs().status(pending).unwrap(), JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(MemoryChain::default());
        let (state, receiver) = ServiceState::new(
            Arc::new(LocalBlobStore::memory()),
            chain,
            SealKey::generate().unwrap(),
            DEFAULT_CHALLENGE,
            ChunkedCipher::new(16, 2).unwrap(),
            dir.path().to_path_buf(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let worker = tokio::spawn(run_worker(
            state.clone(),
            receiver.into_stream(),
            shutdown_rx,
        ));

        // The state still holds a dispatcher, so only the signal can stop it
        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
        assert!(!state.dispatcher().is_connected());
    }

    #[tokio::test]
    async fn test_missing_upload_fails_internal() {
        let dir = TempDir::new().unwrap();
        let (state, _) = state(&dir);
        let id = state.jobs().register();
        execute_job(
            &state,
            Job::StoreFile {
                id,
                upload: dir.path().join("nope"),
                mint: MINT.into(),
                file_name: "a".into(),
                file_extension: "txt".into(),
            },
        )
        .await;
        match state.jobs().outcome(id) {
            Err(JobError::Failed { kind, reason, .. }) => {
                assert_eq!(kind, ErrorKind::Internal);
                assert_eq!(reason, "internal error");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
