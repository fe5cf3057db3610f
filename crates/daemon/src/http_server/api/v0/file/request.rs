use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::error::{Classify, ErrorKind};
use common::gate::{AccessRequest, GateError};
use common::jobs::{DispatchError, Job};

use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::error::{check_version, error_response, UnsupportedVersion};
use crate::ServiceState;

/// Ask the proxy to decrypt a stored file on the requester's behalf. No PRE
/// key is sent; the job uses a throwaway one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRequest {
    #[serde(default)]
    pub version: u32,
    pub key_cid: String,
    pub sol_pubkey: Vec<u8>,
    pub sol_signed_message: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRequestResponse {
    pub uuid: Uuid,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<FileRequest>,
) -> Result<impl IntoResponse, FileRequestError> {
    check_version(req.version)?;
    let access = AccessRequest::new(req.key_cid, &req.sol_pubkey, req.sol_signed_message)?;

    let id = state.jobs().register();
    if let Err(e) = state.dispatcher().dispatch(Job::RequestFile { id, access }) {
        let _ = state.jobs().fail(id, ErrorKind::Internal, "internal error");
        return Err(e.into());
    }

    tracing::info!(job_id = %id, "queued file request");
    Ok((http::StatusCode::OK, Json(FileRequestResponse { uuid: id })).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum FileRequestError {
    #[error(transparent)]
    Version(#[from] UnsupportedVersion),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl Classify for FileRequestError {
    fn kind(&self) -> ErrorKind {
        match self {
            FileRequestError::Version(_) => ErrorKind::Validation,
            FileRequestError::Gate(e) => e.kind(),
            FileRequestError::Dispatch(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for FileRequestError {
    fn into_response(self) -> Response {
        error_response("file request", &self)
    }
}

impl ApiRequest for FileRequest {
    type Response = FileRequestResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join("/api/v0/file/request")
            .expect("static path joins onto a base URL");
        client.post(full_url).json(&self)
    }
}
