use std::fmt::Display;
use std::str::FromStr;

use bytes::Bytes;
use reqwest::{header::HeaderMap, header::HeaderValue, Client, Response};
use url::Url;

use super::error::ApiError;
use super::ApiRequest;
use crate::http_server::api::error::ErrorBody;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let response = self.send(request).await?;
        Ok(response.json::<T::Response>().await?)
    }

    /// Like [`call`](Self::call), for endpoints that answer with raw bytes.
    pub async fn call_bytes<T: ApiRequest>(&self, request: T) -> Result<Bytes, ApiError> {
        let response = self.send(request).await?;
        Ok(response.bytes().await?)
    }

    /// Like [`call`](Self::call), for endpoints that answer with a plain-text
    /// body parsed into the response type.
    pub async fn call_text<T>(&self, request: T) -> Result<T::Response, ApiError>
    where
        T: ApiRequest,
        T::Response: FromStr,
        <T::Response as FromStr>::Err: Display,
    {
        let response = self.send(request).await?;
        let text = response.text().await?;
        text.parse::<T::Response>()
            .map_err(|e| ApiError::Body(e.to_string()))
    }

    async fn send<T: ApiRequest>(&self, request: T) -> Result<Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client);
        let response = request_builder.send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Err(ApiError::Remote(status, body)),
            Err(_) => Err(ApiError::HttpStatus(status, text)),
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
