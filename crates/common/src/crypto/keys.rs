use std::fmt;

use crate::error::{Classify, ErrorKind};

/// Size of a serialized PRE secret key (secp256k1 scalar, big endian).
pub const SECRET_KEY_SIZE: usize = 32;
/// Size of a compressed PRE public key.
pub const PUBLIC_KEY_SIZE: usize = 33;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl Classify for KeyError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// A proxy re-encryption secret key.
///
/// Owners hold one per file; requesters hold one per session. The proxy
/// only ever sees an owner key inside a sealed key bundle. `Debug` never
/// prints key material.
#[derive(Clone)]
pub struct SecretKey(pub(crate) umbral_pre::SecretKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl SecretKey {
    /// Generate a new random key from the OS RNG.
    pub fn generate() -> Self {
        Self(umbral_pre::SecretKey::random())
    }

    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    /// Big endian scalar bytes. Callers are responsible for not logging them.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_be_bytes().as_secret().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(KeyError::InvalidSecretKey(format!(
                "expected {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        // SecretBox has no public constructor; overwrite a fresh one in place
        let mut boxed = umbral_pre::SecretKey::random().to_be_bytes();
        boxed.as_mut_secret().copy_from_slice(bytes);
        umbral_pre::SecretKey::try_from_be_bytes(&boxed)
            .map(Self)
            .map_err(|e| KeyError::InvalidSecretKey(e.to_string()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        Self::from_bytes(&hex::decode(hex)?)
    }
}

/// A proxy re-encryption public key, stored in compressed SEC1 form.
#[derive(Clone, Copy)]
pub struct PublicKey(pub(crate) umbral_pre::PublicKey);

impl PublicKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_compressed_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        umbral_pre::PublicKey::try_from_compressed_bytes(bytes)
            .map(Self)
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        Self::from_bytes(&hex::decode(hex)?)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_key_bytes_roundtrip() {
        let sk = SecretKey::generate();
        let bytes = sk.to_bytes();
        assert_eq!(bytes.len(), SECRET_KEY_SIZE);

        let recovered = SecretKey::from_bytes(&bytes).unwrap();
        assert_eq!(recovered.public(), sk.public());
    }

    #[test]
    fn test_secret_key_from_fixed_bytes_is_stable() {
        let bytes = SecretKey::generate().to_bytes();
        let a = SecretKey::from_bytes(&bytes).unwrap();
        let b = SecretKey::from_hex(&hex::encode(&bytes)).unwrap();
        assert_eq!(a.to_bytes(), bytes);
        assert_eq!(a.public(), b.public());
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let pk = SecretKey::generate().public();
        let hex = pk.to_hex();
        assert_eq!(PublicKey::from_hex(&hex).unwrap(), pk);
        assert_eq!(PublicKey::from_hex(&format!("0x{}", hex)).unwrap(), pk);
    }

    #[test]
    fn test_rejects_wrong_sizes() {
        assert!(matches!(
            SecretKey::from_bytes(&[1u8; 16]),
            Err(KeyError::InvalidSecretKey(_))
        ));
        assert!(matches!(
            PublicKey::from_bytes(&[2u8; 32]),
            Err(KeyError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_point() {
        // right size, but 0x05 is not a valid SEC1 prefix
        let mut bytes = [0u8; PUBLIC_KEY_SIZE];
        bytes[0] = 0x05;
        assert!(PublicKey::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let sk = SecretKey::generate();
        let debug = format!("{:?}", sk);
        assert!(!debug.contains(&sk.to_hex()));
    }
}
