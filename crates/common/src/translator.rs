//! Capsule translation: owner re-encryption material in, requester keys out.

use crate::cipher::{DecryptionKeys, RecryptionKeys, MAX_CHUNK_SIZE};
use crate::codec::{self, CodecError};
use crate::crypto::pre::{Delegation, PreError};
use crate::crypto::{KeyError, PublicKey};
use crate::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("malformed owner secret: {0}")]
    OwnerSecret(#[from] KeyError),
    #[error("malformed capsule: {0}")]
    Capsule(#[from] CodecError),
    #[error("invalid chunk size {0}")]
    ChunkSize(usize),
    #[error("could not derive re-encryption fragment: {0}")]
    Delegation(#[from] PreError),
}

impl Classify for TranslateError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Translation
    }
}

/// Produce decryption keys for `receiver` from stored recryption keys.
///
/// A fresh 1-of-1 fragment scoped to `receiver` is derived and applied to
/// every capsule in order, so `translated_keys[i]` belongs to `capsules[i]`.
/// The owner secret itself is never part of the output.
pub fn translate(
    recryption_keys: &RecryptionKeys,
    receiver: &PublicKey,
) -> Result<DecryptionKeys, TranslateError> {
    if recryption_keys.chunk_size == 0 || recryption_keys.chunk_size > MAX_CHUNK_SIZE {
        return Err(TranslateError::ChunkSize(recryption_keys.chunk_size));
    }
    let owner = recryption_keys.owner_secret()?;
    let capsules = codec::decode_capsules(&recryption_keys.capsules)?;

    let delegation = Delegation::new(&owner, receiver)?;
    let translated_keys = capsules
        .iter()
        .map(|capsule| codec::encode_capsule_frag(&delegation.reencrypt(capsule)))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        capsules = capsules.len(),
        receiver = %receiver,
        "translated capsules"
    );

    Ok(DecryptionKeys {
        owner_pubkey: owner.public().to_bytes(),
        verifying_key: delegation.verifying_key().to_bytes(),
        capsules: recryption_keys.capsules.clone(),
        translated_keys,
        chunk_size: recryption_keys.chunk_size,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::cipher::{CipherError, ChunkedCipher};
    use crate::crypto::SecretKey;

    fn encrypted(plaintext: &[u8], cipher: &ChunkedCipher) -> (RecryptionKeys, Vec<u8>) {
        let owner = SecretKey::generate();
        let mut ciphertext = Vec::new();
        let capsules = cipher
            .encrypt(&owner.public(), Cursor::new(plaintext), &mut ciphertext)
            .unwrap();
        let keys = RecryptionKeys::new(&owner, &capsules, cipher.chunk_size()).unwrap();
        (keys, ciphertext)
    }

    #[test]
    fn test_delegated_decryption() {
        let cipher = ChunkedCipher::new(16, 4).unwrap();
        let plaintext: Vec<u8> = (0..100u8).collect();
        let (recryption_keys, ciphertext) = encrypted(&plaintext, &cipher);

        let bob = SecretKey::generate();
        let keys = translate(&recryption_keys, &bob.public()).unwrap();
        assert_eq!(keys.capsules.len(), keys.translated_keys.len());
        assert_eq!(keys.capsules, recryption_keys.capsules);
        assert_eq!(keys.chunk_size, 16);

        let mut recovered = Vec::new();
        cipher
            .decrypt(&keys, &bob, Cursor::new(ciphertext), &mut recovered)
            .unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_keys_are_not_transferable() {
        let cipher = ChunkedCipher::default();
        let (recryption_keys, ciphertext) = encrypted(b"hello world", &cipher);

        let bob = SecretKey::generate();
        let eve = SecretKey::generate();
        let keys = translate(&recryption_keys, &bob.public()).unwrap();

        let mut out = Vec::new();
        let err = cipher
            .decrypt(&keys, &eve, Cursor::new(ciphertext), &mut out)
            .unwrap_err();
        assert!(matches!(err, CipherError::Crypto { index: 0, .. }));
        assert_eq!(err.kind(), ErrorKind::Translation);
        assert!(out.is_empty());
    }

    #[test]
    fn test_output_never_contains_owner_secret() {
        let cipher = ChunkedCipher::new(8, 2).unwrap();
        let (recryption_keys, _) = encrypted(b"some plaintext here", &cipher);
        let keys = translate(&recryption_keys, &SecretKey::generate().public()).unwrap();

        let json = serde_json::to_vec(&keys).unwrap();
        let secret = &recryption_keys.owner_secret;
        let as_json = serde_json::to_vec(secret).unwrap();
        assert!(!json.windows(as_json.len()).any(|w| w == as_json.as_slice()));
    }

    #[test]
    fn test_swapped_translated_keys_fail() {
        let cipher = ChunkedCipher::new(8, 2).unwrap();
        let (recryption_keys, ciphertext) = encrypted(&[3u8; 16], &cipher);
        let bob = SecretKey::generate();
        let mut keys = translate(&recryption_keys, &bob.public()).unwrap();
        keys.translated_keys.swap(0, 1);

        let err = cipher
            .decrypt(&keys, &bob, Cursor::new(ciphertext), Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Translation);
    }

    #[test]
    fn test_malformed_capsule_is_translation_error() {
        let owner = SecretKey::generate();
        let keys = RecryptionKeys {
            owner_secret: owner.to_bytes(),
            capsules: vec![vec![0xde, 0xad]],
            chunk_size: 10,
        };
        let err = translate(&keys, &SecretKey::generate().public()).unwrap_err();
        assert!(matches!(err, TranslateError::Capsule(_)));
        assert_eq!(err.kind(), ErrorKind::Translation);
    }

    #[test]
    fn test_malformed_owner_secret() {
        let keys = RecryptionKeys {
            owner_secret: vec![1, 2, 3],
            capsules: vec![],
            chunk_size: 10,
        };
        assert!(matches!(
            translate(&keys, &SecretKey::generate().public()),
            Err(TranslateError::OwnerSecret(_))
        ));
    }
}
