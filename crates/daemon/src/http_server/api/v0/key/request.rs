use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::cipher::DecryptionKeys;
use common::crypto::{KeyError, PublicKey};
use common::error::{Classify, ErrorKind};
use common::gate::{AccessRequest, GateError};

use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::error::{check_version, error_response, UnsupportedVersion};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRequest {
    #[serde(default)]
    pub version: u32,
    pub key_cid: String,
    /// Requester's PRE public key, compressed point bytes
    pub precrypt_pubkey: Vec<u8>,
    /// Requester's wallet public key
    pub sol_pubkey: Vec<u8>,
    /// Signature over the challenge by `sol_pubkey`
    pub sol_signed_message: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResponse {
    pub decryption_keys: DecryptionKeys,
    pub file_cid: String,
    pub file_name: String,
    pub file_extension: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<KeyRequest>,
) -> Result<impl IntoResponse, KeyRequestError> {
    check_version(req.version)?;

    let receiver = PublicKey::from_bytes(&req.precrypt_pubkey)?;
    let access = AccessRequest::new(req.key_cid, &req.sol_pubkey, req.sol_signed_message)?;
    let release = state.gate().request_keys(&access, &receiver).await?;

    Ok((
        http::StatusCode::OK,
        Json(KeyResponse {
            decryption_keys: release.decryption_keys,
            file_cid: release.file_cid,
            file_name: release.file_name,
            file_extension: release.file_extension,
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum KeyRequestError {
    #[error(transparent)]
    Version(#[from] UnsupportedVersion),
    #[error("invalid precrypt public key: {0}")]
    ReceiverKey(#[from] KeyError),
    #[error(transparent)]
    Gate(#[from] GateError),
}

impl Classify for KeyRequestError {
    fn kind(&self) -> ErrorKind {
        match self {
            KeyRequestError::Version(_) => ErrorKind::Validation,
            KeyRequestError::ReceiverKey(e) => e.kind(),
            KeyRequestError::Gate(e) => e.kind(),
        }
    }
}

impl IntoResponse for KeyRequestError {
    fn into_response(self) -> Response {
        error_response("key request", &self)
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for KeyRequest {
    type Response = KeyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join("/api/v0/key/request")
            .expect("static path joins onto a base URL");
        client.post(full_url).json(&self)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use common::cipher::{ChunkedCipher, RecryptionKeys};
    use common::crypto::SecretKey;
    use common::gate::DEFAULT_CHALLENGE;
    use common::store::{KeyBundle, KEY_BUNDLE_VERSION};
    use common::testkit::TestWallet;

    use super::*;
    use crate::http_server::api::v0::tests::test_state;

    const MINT: &str = "mint";
    const TEXT: &[u8] = b"Hello world! Readers need tokens.";

    /// Encrypt `TEXT` under a fresh owner key and store its bundle.
    async fn stored(state: &ServiceState) -> (String, Vec<u8>) {
        let owner = SecretKey::generate();
        let cipher = ChunkedCipher::new(8, 2).unwrap();
        let mut ciphertext = Vec::new();
        let capsules = cipher
            .encrypt(&owner.public(), Cursor::new(TEXT), &mut ciphertext)
            .unwrap();
        let bundle = KeyBundle {
            version: KEY_BUNDLE_VERSION,
            recryption_keys: RecryptionKeys::new(&owner, &capsules, 8).unwrap(),
            mint: MINT.into(),
            file_cid: "bafyfile".into(),
            file_name: "hello".into(),
            file_extension: "txt".into(),
        };
        let cid = state.gate().vault().store(&bundle).await.unwrap();
        (cid, ciphertext)
    }

    fn request(key_cid: String, wallet: &TestWallet, receiver: &SecretKey) -> KeyRequest {
        KeyRequest {
            version: 0,
            key_cid,
            precrypt_pubkey: receiver.public().to_bytes(),
            sol_pubkey: wallet.public().as_bytes().to_vec(),
            sol_signed_message: wallet.sign(DEFAULT_CHALLENGE.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_holder_decrypts() {
        let (state, chain, _dir) = test_state();
        let (key_cid, ciphertext) = stored(&state).await;
        let wallet = TestWallet::generate();
        chain.set_balance(&wallet.public(), MINT, 1);
        let receiver = SecretKey::generate();

        let response = handler(State(state), Json(request(key_cid, &wallet, &receiver)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), http::StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: KeyResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.file_cid, "bafyfile");
        assert_eq!(body.file_name, "hello");

        let mut plaintext = Vec::new();
        ChunkedCipher::new(8, 2)
            .unwrap()
            .decrypt(
                &body.decryption_keys,
                &receiver,
                Cursor::new(ciphertext),
                &mut plaintext,
            )
            .unwrap();
        assert_eq!(plaintext, TEXT);
    }

    #[tokio::test]
    async fn test_zero_balance_is_forbidden() {
        let (state, _chain, _dir) = test_state();
        let (key_cid, _) = stored(&state).await;
        let wallet = TestWallet::generate();

        let err = handler(
            State(state),
            Json(request(key_cid, &wallet, &SecretKey::generate())),
        )
        .await
        .err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert_eq!(err.into_response().status(), http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_wrong_signature_is_unauthorized() {
        let (state, chain, _dir) = test_state();
        let (key_cid, _) = stored(&state).await;
        let wallet = TestWallet::generate();
        chain.set_balance(&wallet.public(), MINT, 5);
        let mut req = request(key_cid, &wallet, &SecretKey::generate());
        req.sol_signed_message = wallet.sign(b"something else");

        let err = handler(State(state), Json(req)).await.err().unwrap();
        assert_eq!(err.into_response().status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(chain.queries(), 0);
    }

    #[tokio::test]
    async fn test_garbage_receiver_key_is_bad_request() {
        let (state, _chain, _dir) = test_state();
        let wallet = TestWallet::generate();
        let mut req = request("bafykey".into(), &wallet, &SecretKey::generate());
        req.precrypt_pubkey = vec![1, 2, 3];

        let err = handler(State(state), Json(req)).await.err().unwrap();
        assert!(matches!(err, KeyRequestError::ReceiverKey(_)));
        assert_eq!(err.into_response().status(), http::StatusCode::BAD_REQUEST);
    }
}
