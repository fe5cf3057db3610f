//! At-rest sealing for key bundles using ChaCha20-Poly1305
//!
//! The proxy stores owner re-encryption material on a public blob network.
//! Before it leaves the process it is sealed with a key only the proxy
//! holds, so anyone can fetch the blob but nobody else can read it.

use chacha20poly1305::Key;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SEAL_KEY_SIZE: usize = 32;
/// Size of BLAKE3 hash in bytes (256 bits)
pub const BLAKE3_HASH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("invalid seal key size, expected {SEAL_KEY_SIZE}, got {0}")]
    InvalidKeySize(usize),
    #[error("invalid seal key encoding: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("failed to generate random bytes: {0}")]
    Random(String),
    #[error("sealing failed")]
    Seal,
    #[error("sealed data is malformed or was sealed with another key")]
    Open,
    #[error("sealed data failed its integrity check")]
    Integrity,
}

/// A 256-bit symmetric key owned by the proxy.
///
/// Sealed format: `nonce (12) || encrypted(blake3(plaintext) (32) || plaintext) || tag (16)`.
#[derive(PartialEq, Clone)]
pub struct SealKey([u8; SEAL_KEY_SIZE]);

impl std::fmt::Debug for SealKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealKey(<redacted>)")
    }
}

impl From<[u8; SEAL_KEY_SIZE]> for SealKey {
    fn from(bytes: [u8; SEAL_KEY_SIZE]) -> Self {
        SealKey(bytes)
    }
}

impl SealKey {
    pub fn generate() -> Result<Self, SealError> {
        let mut buff = [0; SEAL_KEY_SIZE];
        getrandom::getrandom(&mut buff).map_err(|e| SealError::Random(e.to_string()))?;
        Ok(Self(buff))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, SealError> {
        let bytes: [u8; SEAL_KEY_SIZE] = data
            .try_into()
            .map_err(|_| SealError::InvalidKeySize(data.len()))?;
        Ok(bytes.into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self, SealError> {
        Self::from_slice(&hex::decode(hex.trim())?)
    }

    pub fn seal(&self, data: &[u8]) -> Result<Vec<u8>, SealError> {
        let plaintext_hash = blake3::hash(data);

        let mut data_with_hash = Vec::with_capacity(BLAKE3_HASH_SIZE + data.len());
        data_with_hash.extend_from_slice(plaintext_hash.as_bytes());
        data_with_hash.extend_from_slice(data);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes).map_err(|e| SealError::Random(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data_with_hash.as_ref())
            .map_err(|_| SealError::Seal)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());
        Ok(out)
    }

    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, SealError> {
        if data.len() < NONCE_SIZE {
            return Err(SealError::Open);
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let decrypted = cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| SealError::Open)?;

        if decrypted.len() < BLAKE3_HASH_SIZE {
            return Err(SealError::Integrity);
        }
        let (stored_hash, plaintext) = decrypted.split_at(BLAKE3_HASH_SIZE);
        if stored_hash != blake3::hash(plaintext).as_bytes() {
            return Err(SealError::Integrity);
        }

        Ok(plaintext.to_vec())
    }
}
