//! Chunked file encryption under proxy re-encryption.
//!
//! A file is cut into fixed-size plaintext chunks. Every chunk is encrypted
//! on its own, yielding one capsule per chunk; the ciphertext is the plain
//! concatenation of the encrypted chunks. Capsule order is chunk order.

mod engine;
mod keys;

pub(crate) use engine::check_chunk_size;
pub use engine::{ChunkedCipher, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS, MAX_CHUNK_SIZE};
pub use keys::{DecryptionKeys, KeyPair, RecryptionKeys};

use crate::codec::CodecError;
use crate::crypto::pre::PreError;
use crate::crypto::KeyError;
use crate::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("invalid cipher configuration: {0}")]
    InvalidConfig(String),
    #[error("{capsules} capsules but {translated_keys} translated keys")]
    KeyCountMismatch {
        capsules: usize,
        translated_keys: usize,
    },
    #[error("ciphertext has {found} chunks, keys cover {expected}")]
    ChunkCountMismatch { expected: usize, found: usize },
    #[error("ciphertext ends with a truncated chunk of {0} bytes")]
    TruncatedChunk(usize),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("chunk {index}: {source}")]
    Crypto {
        index: usize,
        #[source]
        source: PreError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for CipherError {
    fn kind(&self) -> ErrorKind {
        match self {
            CipherError::Crypto { .. } => ErrorKind::Translation,
            CipherError::Io(_) => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }
}
