use ed25519_dalek::{Signature, VerifyingKey};

/// Size of an Ed25519 wallet public key in bytes
pub const WALLET_KEY_SIZE: usize = 32;
/// Size of an Ed25519 detached signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid wallet key: {0}")]
    InvalidKey(String),
    #[error("invalid signature encoding: expected {SIGNATURE_SIZE} bytes, got {0}")]
    InvalidSignature(usize),
    #[error("signature does not verify")]
    BadSignature,
}

/// The on-chain account key of a requester (a Solana wallet).
///
/// Used for two things only: verifying the detached signature over the
/// access challenge, and naming the account in chain-state queries
/// (base58, the way the chain addresses it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalletPublicKey([u8; WALLET_KEY_SIZE]);

impl WalletPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let bytes: [u8; WALLET_KEY_SIZE] = bytes.try_into().map_err(|_| {
            WalletError::InvalidKey(format!(
                "expected {} bytes, got {}",
                WALLET_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn from_base58(s: &str) -> Result<Self, WalletError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn as_bytes(&self) -> &[u8; WALLET_KEY_SIZE] {
        &self.0
    }

    /// Verify a detached Ed25519 signature over `msg`.
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), WalletError> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        let signature = Signature::from_slice(signature)
            .map_err(|_| WalletError::InvalidSignature(signature.len()))?;
        verifying_key
            .verify_strict(msg, &signature)
            .map_err(|_| WalletError::BadSignature)
    }
}

impl std::fmt::Display for WalletPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base58())
    }
}
