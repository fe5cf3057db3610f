//! Canonical byte encoding for capsules and capsule fragments.
//!
//! Capsules and translated keys travel as opaque byte strings inside JSON
//! documents. Both sides of every exchange go through this module, so the
//! encoding is defined in exactly one place.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::crypto::pre::{Capsule, CapsuleFrag};
use crate::error::{Classify, ErrorKind};

/// Upper bound on any encoded item; real capsules and fragments are a few
/// hundred bytes, anything larger is garbage.
const MAX_ENCODED_LEN: u64 = 4 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },
    #[error("malformed {what} at index {index}: {reason}")]
    Decode {
        what: &'static str,
        index: usize,
        reason: String,
    },
}

impl Classify for CodecError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_ENCODED_LEN)
        .reject_trailing_bytes()
}

fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>, CodecError> {
    options().serialize(value).map_err(|e| CodecError::Encode {
        what,
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(what: &'static str, index: usize, bytes: &[u8]) -> Result<T, CodecError> {
    options().deserialize(bytes).map_err(|e| CodecError::Decode {
        what,
        index,
        reason: e.to_string(),
    })
}

pub fn encode_capsule(capsule: &Capsule) -> Result<Vec<u8>, CodecError> {
    encode("capsule", capsule)
}

pub fn decode_capsule(bytes: &[u8]) -> Result<Capsule, CodecError> {
    decode("capsule", 0, bytes)
}

pub fn encode_capsule_frag(cfrag: &CapsuleFrag) -> Result<Vec<u8>, CodecError> {
    encode("translated key", cfrag)
}

pub fn decode_capsule_frag(bytes: &[u8]) -> Result<CapsuleFrag, CodecError> {
    decode("translated key", 0, bytes)
}

/// Encode an ordered list, keeping the order.
pub fn encode_capsules(capsules: &[Capsule]) -> Result<Vec<Vec<u8>>, CodecError> {
    capsules.iter().map(encode_capsule).collect()
}

/// Decode an ordered list; errors name the offending index.
pub fn decode_capsules(encoded: &[Vec<u8>]) -> Result<Vec<Capsule>, CodecError> {
    encoded
        .iter()
        .enumerate()
        .map(|(index, bytes)| decode("capsule", index, bytes))
        .collect()
}

pub fn encode_capsule_frags(cfrags: &[CapsuleFrag]) -> Result<Vec<Vec<u8>>, CodecError> {
    cfrags.iter().map(encode_capsule_frag).collect()
}

pub fn decode_capsule_frags(encoded: &[Vec<u8>]) -> Result<Vec<CapsuleFrag>, CodecError> {
    encoded
        .iter()
        .enumerate()
        .map(|(index, bytes)| decode("translated key", index, bytes))
        .collect()
}
