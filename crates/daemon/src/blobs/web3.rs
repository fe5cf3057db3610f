use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use common::store::{BlobStore, BlobStoreError};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    cid: String,
}

/// Blob store backed by web3.storage uploads and a public IPFS gateway.
#[derive(Clone)]
pub struct Web3BlobStore {
    client: Client,
    api_url: Url,
    gateway_url: Url,
    token: String,
}

impl std::fmt::Debug for Web3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Web3BlobStore")
            .field("api_url", &self.api_url.as_str())
            .field("gateway_url", &self.gateway_url.as_str())
            .finish()
    }
}

impl Web3BlobStore {
    pub fn new(api_url: Url, gateway_url: Url, token: String) -> Result<Self, BlobStoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BlobStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            api_url,
            gateway_url,
            token,
        })
    }

    fn upload_url(&self) -> Result<Url, BlobStoreError> {
        self.api_url
            .join("upload")
            .map_err(|e| BlobStoreError::Unavailable(e.to_string()))
    }

    fn content_url(&self, cid: &str) -> Result<Url, BlobStoreError> {
        if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BlobStoreError::InvalidId(cid.to_string()));
        }
        self.gateway_url
            .join(&format!("ipfs/{}", cid))
            .map_err(|e| BlobStoreError::InvalidId(e.to_string()))
    }
}

/// Outcome of one attempt. Only `Retry` is tried again.
enum Attempt<T> {
    Done(T),
    Retry(String),
    Fail(BlobStoreError),
}

async fn with_retries<T, F, Fut>(what: &str, mut attempt: F) -> Result<T, BlobStoreError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Attempt<T>>,
{
    let mut last = String::new();
    for n in 1..=MAX_ATTEMPTS {
        match attempt().await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fail(e) => return Err(e),
            Attempt::Retry(reason) => {
                tracing::warn!(attempt = n, "{} failed: {}", what, reason);
                last = reason;
                if n < MAX_ATTEMPTS {
                    tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(n - 1)).await;
                }
            }
        }
    }
    Err(BlobStoreError::Unavailable(format!(
        "{} failed after {} attempts: {}",
        what, MAX_ATTEMPTS, last
    )))
}

async fn upload_once(request: RequestBuilder) -> Attempt<String> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return Attempt::Retry(e.to_string()),
    };

    let status = response.status();
    if status.is_server_error() {
        return Attempt::Retry(format!("status {}", status));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Attempt::Fail(BlobStoreError::Unavailable(format!(
            "upload rejected with {}: {}",
            status, text
        )));
    }
    match response.json::<UploadResponse>().await {
        Ok(upload) => Attempt::Done(upload.cid),
        Err(e) => Attempt::Fail(BlobStoreError::Unavailable(format!(
            "unexpected upload response: {}",
            e
        ))),
    }
}

async fn fetch_once(request: RequestBuilder, id: String) -> Attempt<Bytes> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return Attempt::Retry(e.to_string()),
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Attempt::Fail(BlobStoreError::NotFound(id));
    }
    if status.is_server_error() {
        return Attempt::Retry(format!("status {}", status));
    }
    if !status.is_success() {
        return Attempt::Fail(BlobStoreError::Unavailable(format!(
            "gateway returned {}",
            status
        )));
    }
    match response.bytes().await {
        Ok(bytes) => Attempt::Done(bytes),
        Err(e) => Attempt::Retry(e.to_string()),
    }
}

#[async_trait]
impl BlobStore for Web3BlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, BlobStoreError> {
        let url = self.upload_url()?;
        let body = Bytes::from(bytes);

        let cid = with_retries("web3 upload", || {
            upload_once(
                self.client
                    .post(url.clone())
                    .bearer_auth(&self.token)
                    .body(body.clone()),
            )
        })
        .await?;

        tracing::debug!(%cid, "uploaded blob to web3.storage");
        Ok(cid)
    }

    async fn get(&self, id: &str) -> Result<Bytes, BlobStoreError> {
        let url = self.content_url(id)?;
        with_retries("gateway fetch", || {
            fetch_once(self.client.get(url.clone()), id.to_string())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Mock {
        blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        uploads: Arc<AtomicUsize>,
        fail_first: usize,
    }

    async fn upload(
        State(mock): State<Mock>,
        headers: HeaderMap,
        body: axum::body::Bytes,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        let n = mock.uploads.fetch_add(1, Ordering::SeqCst);
        if n < mock.fail_first {
            return Err(StatusCode::BAD_GATEWAY);
        }
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer token") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let cid = format!("bafy{}", n);
        mock.blobs.lock().await.insert(cid.clone(), body.to_vec());
        Ok(Json(serde_json::json!({ "cid": cid })))
    }

    async fn fetch(
        State(mock): State<Mock>,
        Path(cid): Path<String>,
    ) -> Result<Vec<u8>, StatusCode> {
        mock.blobs
            .lock()
            .await
            .get(&cid)
            .cloned()
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn serve(mock: Mock) -> Url {
        let router = Router::new()
            .route("/upload", post(upload))
            .route("/ipfs/:cid", get(fetch))
            .with_state(mock);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    fn store(base: &Url, token: &str) -> Web3BlobStore {
        Web3BlobStore::new(base.clone(), base.clone(), token.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let base = serve(Mock::default()).await;
        let blobs = store(&base, "token");

        let cid = blobs.put(b"sealed bundle".to_vec()).await.unwrap();
        assert_eq!(&blobs.get(&cid).await.unwrap()[..], b"sealed bundle");
    }

    #[tokio::test]
    async fn test_put_retries_server_errors() {
        let mock = Mock {
            fail_first: 2,
            ..Default::default()
        };
        let uploads = mock.uploads.clone();
        let base = serve(mock).await;

        let cid = store(&base, "token").put(b"data".to_vec()).await.unwrap();
        assert_eq!(cid, "bafy2");
        assert_eq!(uploads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_put_gives_up_after_max_attempts() {
        let mock = Mock {
            fail_first: 10,
            ..Default::default()
        };
        let uploads = mock.uploads.clone();
        let base = serve(mock).await;

        let err = store(&base, "token").put(b"data".to_vec()).await.unwrap_err();
        assert!(matches!(err, BlobStoreError::Unavailable(_)));
        assert_eq!(uploads.load(Ordering::SeqCst), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_rejected_token_is_not_retried() {
        let mock = Mock::default();
        let uploads = mock.uploads.clone();
        let base = serve(mock).await;

        let err = store(&base, "wrong").put(b"data".to_vec()).await.unwrap_err();
        assert!(matches!(err, BlobStoreError::Unavailable(_)));
        assert_eq!(uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let base = serve(Mock::default()).await;
        let err = store(&base, "token").get("bafymissing").await.unwrap_err();
        assert!(matches!(err, BlobStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_rejects_path_like_ids() {
        let base = serve(Mock::default()).await;
        let err = store(&base, "token").get("../upload").await.unwrap_err();
        assert!(matches!(err, BlobStoreError::InvalidId(_)));
    }
}
