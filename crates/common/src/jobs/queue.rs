//! Background job dispatcher for whole-file operations
//!
//! Uploads and fetches of whole files take far longer than a request should
//! block. Handlers register a job, hand it to the dispatcher and return the
//! job id; a worker task drains the receiver.

use std::path::PathBuf;

use uuid::Uuid;

use crate::gate::AccessRequest;

/// Work the file worker knows how to do
#[derive(Debug, Clone)]
pub enum Job {
    /// Encrypt an uploaded file under a fresh per-file key, publish the
    /// ciphertext and store its key bundle.
    StoreFile {
        id: Uuid,
        /// Plaintext upload, already written to the job's work directory
        upload: PathBuf,
        /// Mint gating access to the stored key
        mint: String,
        file_name: String,
        file_extension: String,
    },

    /// Run the access gate for a requester and decrypt the whole file on
    /// their behalf.
    RequestFile { id: Uuid, access: AccessRequest },
}

impl Job {
    pub fn id(&self) -> Uuid {
        match self {
            Job::StoreFile { id, .. } | Job::RequestFile { id, .. } => *id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("job receiver has been dropped")]
pub struct DispatchError;

/// Cloneable handle for sending jobs to the worker
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    tx: flume::Sender<Job>,
}

impl JobDispatcher {
    /// Create a dispatcher and the receiver the worker task should own.
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, JobReceiver { rx })
    }

    /// Non-blocking; fails only once the receiver is gone.
    pub fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        tracing::info!(job_id = %job.id(), "dispatching job");
        self.tx.send(job).map_err(|_| DispatchError)
    }

    /// Whether a worker still holds the receiving end.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_disconnected()
    }
}

#[derive(Debug)]
pub struct JobReceiver {
    rx: flume::Receiver<Job>,
}

impl JobReceiver {
    /// Next job, or `None` once every dispatcher has been dropped.
    pub async fn recv(&self) -> Option<Job> {
        self.rx.recv_async().await.ok()
    }

    pub fn try_recv(&self) -> Option<Job> {
        self.rx.try_recv().ok()
    }

    /// Consume the receiver as a stream for a `select!` driven worker loop.
    pub fn into_stream(self) -> flume::r#async::RecvStream<'static, Job> {
        self.rx.into_stream()
    }
}
