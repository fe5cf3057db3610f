use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::error::Classify;
use common::jobs::{JobError, JobStatus};

use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::error::error_response;
use crate::ServiceState;

/// Poll a whole-file job. The daemon answers with the bare status name,
/// so send it with [`ApiClient::call_text`](crate::http_server::api::client::ApiClient::call_text).
/// Why a job failed is reported by `GET /api/v0/file/:uuid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub uuid: Uuid,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(uuid): Path<Uuid>,
) -> Result<impl IntoResponse, StatusError> {
    let status = state.jobs().status(uuid)?;
    Ok((http::StatusCode::OK, status.to_string()).into_response())
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct StatusError(#[from] JobError);

impl Classify for StatusError {
    fn kind(&self) -> common::error::ErrorKind {
        self.0.kind()
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        error_response("file status", &self)
    }
}

impl ApiRequest for StatusRequest {
    type Response = JobStatus;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join(&format!("/api/v0/file/status/{}", self.uuid))
            .expect("uuid path joins onto a base URL");
        client.get(full_url)
    }
}
