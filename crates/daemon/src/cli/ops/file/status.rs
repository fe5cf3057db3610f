use clap::Args;
use uuid::Uuid;

use precrypt_daemon::http_server::api::client::ApiError;
use common::jobs::JobStatus;
use precrypt_daemon::http_server::api::v0::file::StatusRequest;

#[derive(Args, Debug, Clone)]
pub struct Status {
    /// Job id returned by `file store` or `file request`
    pub uuid: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum FileStatusError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Status {
    type Error = FileStatusError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let status = ctx.client.call_text(StatusRequest { uuid: self.uuid }).await?;
        Ok(match status {
            JobStatus::Failed => format!("{} (run `file fetch {}` for the reason)", status, self.uuid),
            _ => status.to_string(),
        })
    }
}
