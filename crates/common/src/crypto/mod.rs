//! Cryptographic primitives for Precrypt
//!
//! - **PRE keys**: `SecretKey`/`PublicKey` over secp256k1, used by owners to
//!   encrypt file chunks and by requesters to receive translated keys
//! - **PRE operations**: chunk encryption, single-use delegations and
//!   verified decryption, all behind [`pre`]
//! - **Wallet keys**: Ed25519 account keys that sign the access challenge
//! - **Sealing**: the proxy's ChaCha20-Poly1305 key for key bundles at rest
//!
//! # Trust model
//!
//! Owners encrypt under a per-file PRE key and hand the proxy that key's
//! secret together with the ordered capsules. The proxy keeps it sealed and,
//! for an authorized requester, derives a 1-of-1 fragment bound to the
//! requester's PRE public key. The requester verifies every capsule fragment
//! before decrypting; fragments are useless to any other key.

mod keys;
pub mod pre;
mod seal;
mod wallet;

pub use keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};
pub use seal::{SealError, SealKey, SEAL_KEY_SIZE};
pub use wallet::{WalletError, WalletPublicKey, SIGNATURE_SIZE, WALLET_KEY_SIZE};
