use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use common::error::{Classify, ErrorKind};
use common::jobs::JobError;

use crate::file_jobs::FileOutcome;
use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::error::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub uuid: Uuid,
}

/// Result of a finished store job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub file_cid: String,
    pub key_cid: String,
}

/// Completed store jobs answer with [`StoredFile`]; completed request jobs
/// stream the decrypted file.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(uuid): Path<Uuid>,
) -> Result<Response, FetchError> {
    match state.jobs().outcome(uuid)? {
        FileOutcome::Stored { file_cid, key_cid } => Ok((
            http::StatusCode::OK,
            axum::Json(StoredFile { file_cid, key_cid }),
        )
            .into_response()),
        FileOutcome::Decrypted {
            path,
            file_name,
            file_extension,
        } => {
            let file = tokio::fs::File::open(&path).await?;
            let download = if file_extension.is_empty() {
                file_name
            } else {
                format!("{}.{}", file_name, file_extension)
            };
            tracing::debug!(job_id = %uuid, %download, "streaming result");

            Ok((
                http::StatusCode::OK,
                [
                    (CONTENT_TYPE, "application/octet-stream".to_string()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", download.replace('"', "")),
                    ),
                ],
                Body::from_stream(ReaderStream::new(file)),
            )
                .into_response())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error("result file unreadable: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for FetchError {
    fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Job(e) => e.kind(),
            FetchError::Io(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        error_response("file fetch", &self)
    }
}

impl ApiRequest for FetchRequest {
    type Response = StoredFile;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join(&format!("/api/v0/file/{}", self.uuid))
            .expect("uuid path joins onto a base URL");
        client.get(full_url)
    }
}
