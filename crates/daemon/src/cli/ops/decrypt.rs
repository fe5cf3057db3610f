use std::path::PathBuf;

use clap::Args;

use common::cipher::{CipherError, ChunkedCipher, DecryptionKeys, KeyPair, DEFAULT_WORKERS};
use common::crypto::KeyError;

use super::{read_json, ArtifactError};

/// Decrypt a file with translated keys and the receiver's keypair
#[derive(Args, Debug, Clone)]
pub struct Decrypt {
    /// Ciphertext to decrypt
    pub input: PathBuf,
    /// Decryption keys issued for the receiver
    pub decryption_keys: PathBuf,
    /// Receiver keypair (see `keygen`)
    pub receiver_keypair: PathBuf,
    /// Output path for the plaintext
    pub output: PathBuf,

    /// Upper bound on chunks decrypted in parallel
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_WORKERS)]
    pub threads: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid keypair: {0}")]
    Key(#[from] KeyError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error("decryption task failed: {0}")]
    Task(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Decrypt {
    type Error = DecryptError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys: DecryptionKeys = read_json(&self.decryption_keys)?;
        let keypair: KeyPair = read_json(&self.receiver_keypair)?;
        let receiver = keypair.secret()?;
        // Chunk size was fixed at encryption time; threads only cap the workers
        let cipher = ChunkedCipher::fitted(keys.chunk_size, self.threads)?;

        let input = self.input.clone();
        let output = self.output.clone();
        tokio::task::spawn_blocking(move || cipher.decrypt_file(&keys, &receiver, &input, &output))
            .await
            .map_err(|e| DecryptError::Task(e.to_string()))??;

        Ok(format!("decrypted to {}", self.output.display()))
    }
}

#[cfg(test)]
mod tests {
    use common::cipher::RecryptionKeys;
    use common::translator::translate;
    use url::Url;

    use super::super::{write_json, Encrypt};
    use super::*;
    use crate::cli::op::{Op, OpContext};

    #[tokio::test]
    async fn test_decrypts_chunk_size_the_threads_do_not_divide() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = |name: &str| dir.path().join(name);
        let ctx = OpContext::new(Url::parse("http://localhost:3000").unwrap(), None).unwrap();

        let owner = KeyPair::generate();
        let receiver = KeyPair::generate();
        write_json(&path("owner.json"), &owner).unwrap();
        write_json(&path("receiver.json"), &receiver).unwrap();
        let plaintext: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(path("plain.bin"), &plaintext).unwrap();

        Encrypt {
            input: path("plain.bin"),
            owner_keypair: path("owner.json"),
            output_keys: path("recrypt.json"),
            output_file: path("cipher.bin"),
            threads: 1,
            chunk_size: 1001,
        }
        .execute(&ctx)
        .await
        .unwrap();

        let recryption: RecryptionKeys = read_json(&path("recrypt.json")).unwrap();
        let keys = translate(&recryption, &receiver.public().unwrap()).unwrap();
        write_json(&path("keys.json"), &keys).unwrap();

        Decrypt {
            input: path("cipher.bin"),
            decryption_keys: path("keys.json"),
            receiver_keypair: path("receiver.json"),
            output: path("out.bin"),
            threads: DEFAULT_WORKERS,
        }
        .execute(&ctx)
        .await
        .unwrap();

        assert_eq!(std::fs::read(path("out.bin")).unwrap(), plaintext);
    }
}
