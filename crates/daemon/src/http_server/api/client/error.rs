use reqwest::StatusCode;

use common::error::ErrorKind;

use crate::http_server::api::error::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("{} ({}): {}", .0, .1.kind, .1.msg)]
    Remote(StatusCode, ErrorBody),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("unexpected response body: {0}")]
    Body(String),
}

impl ApiError {
    /// Error kind reported by the daemon, if it sent a structured body.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Remote(_, body) => Some(body.kind),
            _ => None,
        }
    }
}
