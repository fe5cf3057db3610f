use std::path::PathBuf;

use clap::Args;

use common::cipher::{
    CipherError, ChunkedCipher, KeyPair, RecryptionKeys, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS,
};
use common::codec::CodecError;
use common::crypto::KeyError;

use super::{read_json, write_json, ArtifactError};

/// Encrypt a file as its owner and write the recryption keys the proxy needs
#[derive(Args, Debug, Clone)]
pub struct Encrypt {
    /// File to encrypt
    pub input: PathBuf,
    /// Owner keypair (see `keygen`)
    pub owner_keypair: PathBuf,
    /// Output path for the recryption keys
    pub output_keys: PathBuf,
    /// Output path for the ciphertext
    pub output_file: PathBuf,

    /// Chunks encrypted in parallel
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_WORKERS)]
    pub threads: usize,

    /// Plaintext bytes per chunk
    #[arg(short = 'c', long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid keypair: {0}")]
    Key(#[from] KeyError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("encryption task failed: {0}")]
    Task(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Encrypt {
    type Error = EncryptError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let cipher = ChunkedCipher::new(self.chunk_size, self.threads)?;
        let keypair: KeyPair = read_json(&self.owner_keypair)?;
        let owner = keypair.secret()?;
        let owner_public = keypair.public()?;

        let input = self.input.clone();
        let output = self.output_file.clone();
        let capsules = tokio::task::spawn_blocking(move || {
            cipher.encrypt_file(&owner_public, &input, &output)
        })
        .await
        .map_err(|e| EncryptError::Task(e.to_string()))??;

        let keys = RecryptionKeys::new(&owner, &capsules, cipher.chunk_size())?;
        write_json(&self.output_keys, &keys)?;

        Ok(format!(
            "encrypted {} chunk(s) to {}\nrecryption keys: {}",
            capsules.len(),
            self.output_file.display(),
            self.output_keys.display()
        ))
    }
}
