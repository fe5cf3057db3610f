use std::path::PathBuf;

use clap::Args;

use common::cipher::KeyPair;

use super::{write_json, ArtifactError};

/// Write a fresh PRE keypair file
#[derive(Args, Debug, Clone)]
pub struct Keygen {
    /// Output path for the keypair
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum KeygenError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("{0} already exists")]
    Exists(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Keygen {
    type Error = KeygenError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.output.exists() {
            return Err(KeygenError::Exists(self.output.display().to_string()));
        }
        let keypair = KeyPair::generate();
        write_json(&self.output, &keypair)?;
        Ok(format!("public key: {}", keypair.public_key))
    }
}
