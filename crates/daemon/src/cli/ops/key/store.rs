use std::path::PathBuf;

use clap::Args;

use common::cipher::RecryptionKeys;
use precrypt_daemon::http_server::api::client::ApiError;
use precrypt_daemon::http_server::api::v0::key::{KeyStoreRequest, KeyStoreResponse};

use crate::cli::ops::{read_json, ArtifactError};

#[derive(Args, Debug, Clone)]
pub struct Store {
    /// Recryption keys written by `encrypt`
    pub recryption_keys: PathBuf,

    /// Token mint whose holders may request the keys
    #[arg(long)]
    pub mint: String,

    /// Content identifier of the published ciphertext
    #[arg(long)]
    pub file_cid: String,

    #[arg(long, default_value = "")]
    pub file_name: String,

    #[arg(long, default_value = "")]
    pub file_extension: String,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Store {
    type Error = KeyStoreError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let recryption_keys: RecryptionKeys = read_json(&self.recryption_keys)?;
        let request = KeyStoreRequest {
            version: 0,
            recryption_keys,
            mint: self.mint.clone(),
            file_cid: self.file_cid.clone(),
            file_name: self.file_name.clone(),
            file_extension: self.file_extension.clone(),
        };

        let response: KeyStoreResponse = ctx.client.call(request).await?;
        Ok(format!("key cid: {}", response.cid))
    }
}
