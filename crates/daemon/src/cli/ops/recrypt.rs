use std::path::PathBuf;

use clap::Args;

use common::cipher::RecryptionKeys;
use common::crypto::{KeyError, PublicKey};
use common::translator::{translate, TranslateError};

use super::{read_json, write_json, ArtifactError};

/// Translate recryption keys for a receiver locally, without a proxy
#[derive(Args, Debug, Clone)]
pub struct Recrypt {
    /// Recryption keys written by `encrypt`
    pub recryption_keys: PathBuf,
    /// Receiver's PRE public key, hex
    pub receiver_pubkey: String,
    /// Output path for the decryption keys
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum RecryptError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid receiver public key: {0}")]
    Key(#[from] KeyError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Recrypt {
    type Error = RecryptError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys: RecryptionKeys = read_json(&self.recryption_keys)?;
        let receiver = PublicKey::from_hex(self.receiver_pubkey.trim())?;

        let decryption_keys = translate(&keys, &receiver)?;
        write_json(&self.output, &decryption_keys)?;

        Ok(format!(
            "wrote decryption keys for {} to {}",
            receiver,
            self.output.display()
        ))
    }
}
