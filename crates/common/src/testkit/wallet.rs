use ed25519_dalek::{Signer, SigningKey};

use crate::crypto::WalletPublicKey;

/// An Ed25519 wallet that signs challenges the way a browser wallet would.
pub struct TestWallet {
    signing_key: SigningKey,
}

impl TestWallet {
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).expect("os rng");
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn public(&self) -> WalletPublicKey {
        WalletPublicKey::from_bytes(self.signing_key.verifying_key().as_bytes())
            .expect("ed25519 keys are 32 bytes")
    }

    /// Detached signature bytes over `message`.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}
