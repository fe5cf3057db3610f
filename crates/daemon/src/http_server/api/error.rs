//! Error bodies for the API.
//!
//! Every handler error classifies itself into an [`ErrorKind`]; this module
//! turns that into a status code and a `{"kind", "msg"}` body. Internal
//! detail is logged, never returned.

use std::fmt::Display;

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use common::error::{Classify, ErrorKind};

/// Current request schema version. Bodies may omit it.
pub const API_VERSION: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub msg: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Translation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage | ErrorKind::Rpc => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the response for a failed `operation`.
pub fn error_response<E: Classify + Display>(operation: &str, err: &E) -> Response {
    let kind = err.kind();
    let msg = match kind {
        ErrorKind::Internal => {
            tracing::error!(operation, "internal error: {}", err);
            "internal error".to_string()
        }
        _ => {
            tracing::warn!(operation, %kind, "request failed: {}", err);
            err.to_string()
        }
    };
    (status_for(kind), Json(ErrorBody { kind, msg })).into_response()
}

/// Reject bodies written against a newer schema.
pub fn check_version(version: u32) -> Result<(), UnsupportedVersion> {
    if version > API_VERSION {
        return Err(UnsupportedVersion(version));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported request version {0}")]
pub struct UnsupportedVersion(pub u32);
