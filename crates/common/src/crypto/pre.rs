//! Thin boundary over the `umbral-pre` primitives.
//!
//! Nothing outside this file touches the library directly. Everything here is
//! 1-of-1: one key fragment per delegation, one capsule fragment per capsule.

use umbral_pre::{Signer, VerifiedKeyFrag};

pub use umbral_pre::{Capsule, CapsuleFrag, VerifiedCapsuleFrag};

use super::keys::{PublicKey, SecretKey};

/// Bytes added to every plaintext chunk by the DEM: a 24 byte XChaCha20
/// nonce plus a 16 byte Poly1305 tag.
pub const CIPHERTEXT_OVERHEAD: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum PreError {
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
    #[error("key fragment generation failed: {0}")]
    Delegate(String),
    #[error("capsule fragment did not verify: {0}")]
    Verify(String),
}

/// Encrypt one chunk to `owner`, producing its capsule and ciphertext.
pub fn encrypt(owner: &PublicKey, plaintext: &[u8]) -> Result<(Capsule, Vec<u8>), PreError> {
    let (capsule, ciphertext) =
        umbral_pre::encrypt(&owner.0, plaintext).map_err(|e| PreError::Encrypt(e.to_string()))?;
    Ok((capsule, ciphertext.into_vec()))
}

/// Open a chunk with the owner's own key, no translation involved.
pub fn decrypt_original(
    owner: &SecretKey,
    capsule: &Capsule,
    ciphertext: &[u8],
) -> Result<Vec<u8>, PreError> {
    umbral_pre::decrypt_original(&owner.0, capsule, ciphertext)
        .map(|plaintext| plaintext.into_vec())
        .map_err(|e| PreError::Decrypt(e.to_string()))
}

/// A single-use re-encryption grant from an owner to one receiver.
///
/// The fragment is signed by a throwaway signer over both the delegating and
/// the receiving key, so a capsule fragment produced with it only verifies
/// for that exact receiver.
pub struct Delegation {
    kfrag: VerifiedKeyFrag,
    verifying_key: PublicKey,
}

impl Delegation {
    pub fn new(owner: &SecretKey, receiver: &PublicKey) -> Result<Self, PreError> {
        let signer = Signer::new(umbral_pre::SecretKey::random());
        let verifying_key = PublicKey(signer.verifying_key());

        let kfrag = umbral_pre::generate_kfrags(&owner.0, &receiver.0, &signer, 1, 1, true, true)
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| PreError::Delegate("no key fragment generated".into()))?;

        Ok(Self {
            kfrag,
            verifying_key,
        })
    }

    /// Public half of the signer; receivers need it to verify fragments.
    pub fn verifying_key(&self) -> PublicKey {
        self.verifying_key
    }

    /// Re-encrypt one capsule for the delegation's receiver.
    pub fn reencrypt(&self, capsule: &Capsule) -> CapsuleFrag {
        umbral_pre::reencrypt(capsule, self.kfrag.clone()).unverify()
    }
}

/// Check a capsule fragment against the full key context.
///
/// A fragment built for a different receiver, signer or owner is rejected.
pub fn verify_fragment(
    receiver: &PublicKey,
    owner: &PublicKey,
    verifying_key: &PublicKey,
    capsule: &Capsule,
    cfrag: CapsuleFrag,
) -> Result<VerifiedCapsuleFrag, PreError> {
    cfrag
        .verify(capsule, &verifying_key.0, &owner.0, &receiver.0)
        .map_err(|(e, _)| PreError::Verify(e.to_string()))
}

/// Open a chunk with a fragment that already passed [`verify_fragment`].
pub fn decrypt_verified(
    receiver: &SecretKey,
    owner: &PublicKey,
    capsule: &Capsule,
    verified: VerifiedCapsuleFrag,
    ciphertext: &[u8],
) -> Result<Vec<u8>, PreError> {
    umbral_pre::decrypt_reencrypted(&receiver.0, &owner.0, capsule, [verified], ciphertext)
        .map(|plaintext| plaintext.into_vec())
        .map_err(|e| PreError::Decrypt(e.to_string()))
}

/// Verify a capsule fragment, then decrypt its chunk.
pub fn decrypt_reencrypted(
    receiver: &SecretKey,
    owner: &PublicKey,
    verifying_key: &PublicKey,
    capsule: &Capsule,
    cfrag: CapsuleFrag,
    ciphertext: &[u8],
) -> Result<Vec<u8>, PreError> {
    let verified = verify_fragment(&receiver.public(), owner, verifying_key, capsule, cfrag)?;
    decrypt_verified(receiver, owner, capsule, verified, ciphertext)
}
