//! Blob store backends for the daemon.

mod setup;
mod web3;

pub use setup::setup_blob_store;
pub use web3::Web3BlobStore;

#[derive(Debug, thiserror::Error)]
pub enum BlobsSetupError {
    #[error("blob store error: {0}")]
    StoreError(String),
    #[error("web3 blob store needs an API token (--web3-token or PRECRYPT_WEB3_TOKEN)")]
    MissingToken,
}
