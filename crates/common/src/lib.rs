/**
 * Error taxonomy shared by every layer. Each error
 *  type classifies itself into an `ErrorKind` so
 *  callers can surface a stable category.
 */
pub mod error;
/**
 * Cryptographic types and operations.
 *  - Proxy re-encryption keys and capsules
 *  - Wallet signature verification
 *  - Symmetric sealing of data at rest
 */
pub mod crypto;
/**
 * Binary wire form for capsules and translated
 *  capsule fragments.
 */
pub mod codec;
/**
 * Chunked streaming encryption and decryption,
 *  plus the key records exchanged between owner,
 *  proxy and requester.
 */
pub mod cipher;
/**
 * Proxy-side translation of recryption keys
 *  into decryption keys for a single requester.
 */
pub mod translator;
/**
 * Content addressed blob storage and the sealed
 *  key vault built on top of it.
 */
pub mod store;
/**
 * Read-only access to on-chain token balances.
 */
pub mod chain;
/**
 * Token-gated release of decryption keys.
 */
pub mod gate;
/**
 * Background whole-file jobs and their status.
 */
pub mod jobs;
/**
 * In-memory doubles for chain state and wallets.
 */
pub mod testkit;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::cipher::{ChunkedCipher, DecryptionKeys, KeyPair, RecryptionKeys};
    pub use crate::crypto::{PublicKey, SealKey, SecretKey, WalletPublicKey};
    pub use crate::error::{Classify, ErrorKind};
    pub use crate::gate::{AccessGate, AccessRequest, Release};
    pub use crate::store::{BlobStore, KeyBundle, KeyVault, LocalBlobStore};
    pub use crate::translator::translate;
    pub use crate::version::build_info;
}
