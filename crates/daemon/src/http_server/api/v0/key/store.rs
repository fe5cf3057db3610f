use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::cipher::{CipherError, RecryptionKeys};
use common::codec::{self, CodecError};
use common::error::{Classify, ErrorKind};
use common::store::{KeyBundle, VaultError, KEY_BUNDLE_VERSION};

use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::error::{check_version, error_response, UnsupportedVersion};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreRequest {
    #[serde(default)]
    pub version: u32,
    pub recryption_keys: RecryptionKeys,
    /// Token mint whose holders may request these keys
    pub mint: String,
    pub file_cid: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreResponse {
    pub cid: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<KeyStoreRequest>,
) -> Result<impl IntoResponse, KeyStoreError> {
    check_version(req.version)?;
    validate(&req)?;

    // Whoever uploads picks the mint; control of it is not checked
    tracing::warn!(
        mint = %req.mint,
        file_cid = %req.file_cid,
        "storing key without verifying mint control"
    );

    let bundle = KeyBundle {
        version: KEY_BUNDLE_VERSION,
        recryption_keys: req.recryption_keys,
        mint: req.mint,
        file_cid: req.file_cid,
        file_name: req.file_name,
        file_extension: req.file_extension,
    };
    let cid = state.gate().vault().store(&bundle).await?;

    Ok((http::StatusCode::OK, Json(KeyStoreResponse { cid })).into_response())
}

/// Shape checks, all before any cryptography.
fn validate(req: &KeyStoreRequest) -> Result<(), KeyStoreError> {
    if req.mint.trim().is_empty() {
        return Err(KeyStoreError::InvalidRequest("mint is required".into()));
    }
    if req.file_cid.trim().is_empty() {
        return Err(KeyStoreError::InvalidRequest("file_cid is required".into()));
    }
    req.recryption_keys.validate()?;
    codec::decode_capsules(&req.recryption_keys.capsules)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error(transparent)]
    Version(#[from] UnsupportedVersion),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid recryption keys: {0}")]
    Keys(#[from] CipherError),
    #[error("invalid recryption keys: {0}")]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl Classify for KeyStoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            KeyStoreError::Version(_)
            | KeyStoreError::InvalidRequest(_)
            | KeyStoreError::Keys(_)
            | KeyStoreError::Codec(_) => ErrorKind::Validation,
            KeyStoreError::Vault(e) => e.kind(),
        }
    }
}

impl IntoResponse for KeyStoreError {
    fn into_response(self) -> Response {
        error_response("key store", &self)
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for KeyStoreRequest {
    type Response = KeyStoreResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join("/api/v0/key/store")
            .expect("static path joins onto a base URL");
        client.post(full_url).json(&self)
    }
}
