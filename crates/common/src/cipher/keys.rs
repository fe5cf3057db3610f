use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};
use crate::crypto::pre::Capsule;
use crate::crypto::{KeyError, PublicKey, SecretKey};

use super::{check_chunk_size, CipherError};

/// Re-encryption material for one file, authored by its owner and held by
/// the proxy.
///
/// `owner_secret` is the file's own PRE key, generated for this file only.
/// It is never released to requesters; `Debug` leaves it out.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RecryptionKeys {
    pub owner_secret: Vec<u8>,
    pub capsules: Vec<Vec<u8>>,
    pub chunk_size: usize,
}

impl fmt::Debug for RecryptionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecryptionKeys")
            .field("owner_secret", &"<redacted>")
            .field("capsules", &self.capsules.len())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl RecryptionKeys {
    pub fn new(
        owner: &SecretKey,
        capsules: &[Capsule],
        chunk_size: usize,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            owner_secret: owner.to_bytes(),
            capsules: codec::encode_capsules(capsules)?,
            chunk_size,
        })
    }

    pub fn owner_secret(&self) -> Result<SecretKey, KeyError> {
        SecretKey::from_bytes(&self.owner_secret)
    }

    /// Shape checks that do not need any cryptography.
    pub fn validate(&self) -> Result<(), CipherError> {
        check_chunk_size(self.chunk_size)?;
        self.owner_secret()?;
        Ok(())
    }
}

/// Keys issued to one requester for one file.
///
/// `capsules[i]` and `translated_keys[i]` belong to ciphertext chunk `i`.
/// `verifying_key` is the public key of the signer that produced the
/// fragment; the requester checks every translated key against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptionKeys {
    pub owner_pubkey: Vec<u8>,
    pub verifying_key: Vec<u8>,
    pub capsules: Vec<Vec<u8>>,
    pub translated_keys: Vec<Vec<u8>>,
    pub chunk_size: usize,
}

impl DecryptionKeys {
    pub fn validate(&self) -> Result<(), CipherError> {
        if self.capsules.len() != self.translated_keys.len() {
            return Err(CipherError::KeyCountMismatch {
                capsules: self.capsules.len(),
                translated_keys: self.translated_keys.len(),
            });
        }
        check_chunk_size(self.chunk_size)?;
        Ok(())
    }

    pub fn owner_pubkey(&self) -> Result<PublicKey, KeyError> {
        PublicKey::from_bytes(&self.owner_pubkey)
    }

    pub fn verifying_key(&self) -> Result<PublicKey, KeyError> {
        PublicKey::from_bytes(&self.verifying_key)
    }
}

/// On-disk keypair file, as written by `precrypt keygen`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPair {
    pub public_key: String,
    pub secret_key: String,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from(&SecretKey::generate())
    }

    pub fn secret(&self) -> Result<SecretKey, KeyError> {
        SecretKey::from_hex(&self.secret_key)
    }

    /// The public key, checked against the secret so a hand-edited file
    /// cannot pair mismatched halves.
    pub fn public(&self) -> Result<PublicKey, KeyError> {
        let derived = self.secret()?.public();
        if PublicKey::from_hex(&self.public_key)? != derived {
            return Err(KeyError::InvalidPublicKey(
                "public key does not match secret key".into(),
            ));
        }
        Ok(derived)
    }
}

impl From<&SecretKey> for KeyPair {
    fn from(secret: &SecretKey) -> Self {
        Self {
            public_key: secret.public().to_hex(),
            secret_key: secret.to_hex(),
        }
    }
}
