//! Token-gated access to stored keys.
//!
//! A request moves through a fixed sequence of stages and stops at the first
//! failure:
//!
//! 1. verify the signed challenge against the requester's wallet key
//! 2. fetch and open the stored key bundle
//! 3. check the requester's balance of the bundle's mint
//! 4. translate capsules for the requester's PRE key
//! 5. release the decryption keys
//!
//! The mint lives in the bundle, so the fetch comes before the balance
//! check. Nothing reaches either collaborator before the signature verifies.

use std::fmt;
use std::sync::Arc;

use crate::chain::{ChainError, ChainState};
use crate::cipher::DecryptionKeys;
use crate::crypto::{PublicKey, WalletError, WalletPublicKey};
use crate::error::{Classify, ErrorKind};
use crate::store::{KeyBundle, KeyVault, VaultError};
use crate::translator::{self, TranslateError};

pub const DEFAULT_CHALLENGE: &str = "precrypt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    AwaitingRequest,
    VerifySignature,
    Fetch,
    VerifyAuthorization,
    Translate,
    Release,
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            GateStage::AwaitingRequest => "awaiting_request",
            GateStage::VerifySignature => "verify_signature",
            GateStage::Fetch => "fetch",
            GateStage::VerifyAuthorization => "verify_authorization",
            GateStage::Translate => "translate",
            GateStage::Release => "release",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("authentication failed: {0}")]
    Auth(#[from] WalletError),
    #[error("requester holds no tokens of mint {mint}")]
    AccessDenied { mint: String },
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("translation task failed: {0}")]
    Task(String),
}

impl Classify for GateError {
    fn kind(&self) -> ErrorKind {
        match self {
            GateError::Auth(WalletError::InvalidKey(_)) => ErrorKind::Validation,
            GateError::Auth(_) => ErrorKind::Auth,
            GateError::AccessDenied { .. } => ErrorKind::AccessDenied,
            GateError::Vault(e) => e.kind(),
            GateError::Chain(e) => e.kind(),
            GateError::Translate(e) => e.kind(),
            GateError::Task(_) => ErrorKind::Internal,
        }
    }
}

/// A caller's claim to one stored key.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub key_cid: String,
    pub requester: WalletPublicKey,
    pub signed_challenge: Vec<u8>,
}

impl AccessRequest {
    /// Build a request from the raw wallet key bytes sent on the wire.
    pub fn new(
        key_cid: impl Into<String>,
        requester: &[u8],
        signed_challenge: Vec<u8>,
    ) -> Result<Self, GateError> {
        Ok(Self {
            key_cid: key_cid.into(),
            requester: WalletPublicKey::from_bytes(requester)?,
            signed_challenge,
        })
    }
}

/// What an authorized request gets back.
#[derive(Debug, Clone)]
pub struct Release {
    pub decryption_keys: DecryptionKeys,
    pub file_cid: String,
    pub file_name: String,
    pub file_extension: String,
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    vault: KeyVault,
    chain: Arc<dyn ChainState>,
    challenge: String,
}

impl AccessGate {
    pub fn new(vault: KeyVault, chain: Arc<dyn ChainState>, challenge: impl Into<String>) -> Self {
        Self {
            vault,
            chain,
            challenge: challenge.into(),
        }
    }

    pub fn vault(&self) -> &KeyVault {
        &self.vault
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Run the signature, fetch and balance stages, returning the opened
    /// bundle for an authorized requester.
    pub async fn authorize(&self, request: &AccessRequest) -> Result<KeyBundle, GateError> {
        let requester = request.requester;
        trace_stage(GateStage::AwaitingRequest, &request.key_cid, &requester);

        trace_stage(GateStage::VerifySignature, &request.key_cid, &requester);
        requester
            .verify(self.challenge.as_bytes(), &request.signed_challenge)
            .inspect_err(|e| tracing::warn!(%requester, "signature rejected: {}", e))?;

        trace_stage(GateStage::Fetch, &request.key_cid, &requester);
        let bundle = self.vault.load(&request.key_cid).await?;

        trace_stage(GateStage::VerifyAuthorization, &request.key_cid, &requester);
        let balance = self.chain.token_balance(&requester, &bundle.mint).await?;
        if balance == 0 {
            tracing::warn!(%requester, mint = %bundle.mint, "access denied, zero balance");
            return Err(GateError::AccessDenied { mint: bundle.mint });
        }

        Ok(bundle)
    }

    /// Full request: authorize, then translate the bundle's capsules for
    /// `receiver` and release the result.
    pub async fn request_keys(
        &self,
        request: &AccessRequest,
        receiver: &PublicKey,
    ) -> Result<Release, GateError> {
        let bundle = self.authorize(request).await?;

        trace_stage(GateStage::Translate, &request.key_cid, &request.requester);
        let recryption_keys = bundle.recryption_keys;
        let receiver = *receiver;
        let decryption_keys = tokio::task::spawn_blocking(move || {
            translator::translate(&recryption_keys, &receiver)
        })
        .await
        .map_err(|e| GateError::Task(e.to_string()))??;

        trace_stage(GateStage::Release, &request.key_cid, &request.requester);
        Ok(Release {
            decryption_keys,
            file_cid: bundle.file_cid,
            file_name: bundle.file_name,
            file_extension: bundle.file_extension,
        })
    }
}

fn trace_stage(stage: GateStage, key_cid: &str, requester: &WalletPublicKey) {
    tracing::debug!(%stage, key_cid, %requester, "access gate");
}
