use std::path::PathBuf;

use clap::Args;

use precrypt_daemon::http_server::api::client::ApiError;
use precrypt_daemon::http_server::api::v0::file::{FileStoreRequest, FileStoreResponse};

#[derive(Args, Debug, Clone)]
pub struct Store {
    /// File to upload
    pub path: PathBuf,

    /// Token mint whose holders may request the file
    #[arg(long)]
    pub mint: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {0}: {1}")]
    Read(String, #[source] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Store {
    type Error = FileStoreError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let request = FileStoreRequest::from_path(self.mint.clone(), &self.path)
            .await
            .map_err(|e| FileStoreError::Read(self.path.display().to_string(), e))?;

        let response: FileStoreResponse = ctx.client.call(request).await?;
        Ok(format!("job: {}", response.uuid))
    }
}
