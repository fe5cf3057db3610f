use std::path::PathBuf;

use clap::Args;
use uuid::Uuid;

use precrypt_daemon::http_server::api::client::ApiError;
use precrypt_daemon::http_server::api::v0::file::{FetchRequest, StoredFile};

#[derive(Args, Debug, Clone)]
pub struct Fetch {
    /// Job id of a finished job
    pub uuid: Uuid,

    /// Where to write a decrypted file. Store jobs print their identifiers.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum FileFetchError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to write {0}: {1}")]
    Write(String, #[source] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Fetch {
    type Error = FileFetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let bytes = ctx.client.call_bytes(FetchRequest { uuid: self.uuid }).await?;

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, &bytes)
                    .await
                    .map_err(|e| FileFetchError::Write(path.display().to_string(), e))?;
                Ok(format!("wrote {} bytes to {}", bytes.len(), path.display()))
            }
            None => match serde_json::from_slice::<StoredFile>(&bytes) {
                Ok(stored) => Ok(format!(
                    "file cid: {}\nkey cid: {}",
                    stored.file_cid, stored.key_cid
                )),
                Err(_) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            },
        }
    }
}
