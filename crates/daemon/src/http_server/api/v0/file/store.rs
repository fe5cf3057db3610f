use std::path::Path;

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use common::error::{Classify, ErrorKind};
use common::jobs::{DispatchError, Job};

use crate::file_jobs::{job_dir, UPLOAD_FILE_NAME};
use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::error::error_response;
use crate::ServiceState;

/// Client-side form for `POST /file/store`.
#[derive(Debug, Clone)]
pub struct FileStoreRequest {
    pub mint: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreResponse {
    pub uuid: Uuid,
}

pub async fn handler(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, FileStoreError> {
    // Stage outside any job dir so a rejected upload never shows up as a job
    let staging = tempfile::Builder::new()
        .prefix("upload-")
        .tempdir_in(state.work_dir())?;
    let upload = staging.path().join(UPLOAD_FILE_NAME);

    let mut mint: Option<String> = None;
    let mut file_name: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| FileStoreError::Multipart(e.to_string()))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "mint" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| FileStoreError::Multipart(e.to_string()))?;
                mint = Some(text.trim().to_string());
            }
            "file" => {
                if file_name.is_some() {
                    return Err(FileStoreError::InvalidRequest(
                        "only one file may be submitted at a time".into(),
                    ));
                }
                file_name = Some(field.file_name().unwrap_or("").to_string());

                let mut out = tokio::fs::File::create(&upload).await?;
                let mut size = 0usize;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| FileStoreError::Multipart(e.to_string()))?
                {
                    size += chunk.len();
                    out.write_all(&chunk).await?;
                }
                out.flush().await?;
                tracing::debug!(size, "received upload");
            }
            _ => {
                tracing::warn!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let mint = mint
        .filter(|m| !m.is_empty())
        .ok_or_else(|| FileStoreError::InvalidRequest("mint is required".into()))?;
    let file_name =
        file_name.ok_or_else(|| FileStoreError::InvalidRequest("file is required".into()))?;
    let (file_name, file_extension) = split_file_name(&file_name);

    let id = state.jobs().register();
    let dir = job_dir(state.work_dir(), id);
    tokio::fs::rename(staging.path(), &dir).await?;

    let job = Job::StoreFile {
        id,
        upload: dir.join(UPLOAD_FILE_NAME),
        mint,
        file_name,
        file_extension,
    };
    if let Err(e) = state.dispatcher().dispatch(job) {
        let _ = tokio::fs::remove_dir_all(&dir).await;
        let _ = state.jobs().fail(id, ErrorKind::Internal, "internal error");
        return Err(e.into());
    }

    tracing::info!(job_id = %id, "queued file store");
    Ok((http::StatusCode::OK, axum::Json(FileStoreResponse { uuid: id })).into_response())
}

/// Split an upload's name into stem and extension. Only the last dot counts.
fn split_file_name(name: &str) -> (String, String) {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    (stem.to_string(), extension.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("multipart error: {0}")]
    Multipart(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl Classify for FileStoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            FileStoreError::InvalidRequest(_) | FileStoreError::Multipart(_) => {
                ErrorKind::Validation
            }
            FileStoreError::Io(_) | FileStoreError::Dispatch(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for FileStoreError {
    fn into_response(self) -> Response {
        error_response("file store", &self)
    }
}

impl FileStoreRequest {
    /// Read a local file into a request, keeping its name.
    pub async fn from_path(mint: String, path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        Ok(Self {
            mint,
            file_name,
            data,
        })
    }
}

impl ApiRequest for FileStoreRequest {
    type Response = FileStoreResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join("/api/v0/file/store")
            .expect("static path joins onto a base URL");
        let form = Form::new()
            .text("mint", self.mint)
            .part("file", Part::bytes(self.data).file_name(self.file_name));
        client.post(full_url).multipart(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_file_name("report.pdf"),
            ("report".to_string(), "pdf".to_string())
        );
        assert_eq!(
            split_file_name("archive.tar.gz"),
            ("archive.tar".to_string(), "gz".to_string())
        );
        assert_eq!(
            split_file_name("README"),
            ("README".to_string(), String::new())
        );
        assert_eq!(split_file_name(""), ("file".to_string(), String::new()));
    }
}
