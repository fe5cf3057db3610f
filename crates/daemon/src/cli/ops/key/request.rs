use std::path::PathBuf;

use clap::Args;

use common::cipher::KeyPair;
use common::crypto::{KeyError, WalletError, WalletPublicKey};
use precrypt_daemon::http_server::api::client::ApiError;
use precrypt_daemon::http_server::api::v0::key::{KeyRequest, KeyResponse};

use crate::cli::ops::{read_json, write_json, ArtifactError};

#[derive(Args, Debug, Clone)]
pub struct Request {
    /// Identifier returned by `key store`
    #[arg(long)]
    pub key_cid: String,

    /// Receiver keypair; its public half is sent to the proxy
    #[arg(long)]
    pub keypair: PathBuf,

    /// Wallet public key, base58
    #[arg(long)]
    pub wallet: String,

    /// Wallet signature over the proxy's challenge, base58
    #[arg(long)]
    pub signature: String,

    /// Output path for the decryption keys
    #[arg(long, short)]
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyRequestError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid keypair: {0}")]
    Key(#[from] KeyError),
    #[error("invalid wallet key: {0}")]
    Wallet(#[from] WalletError),
    #[error("signature is not base58: {0}")]
    Signature(#[from] bs58::decode::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Request {
    type Error = KeyRequestError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keypair: KeyPair = read_json(&self.keypair)?;
        let wallet = WalletPublicKey::from_base58(&self.wallet)?;
        let signature = bs58::decode(self.signature.trim()).into_vec()?;

        let request = KeyRequest {
            version: 0,
            key_cid: self.key_cid.clone(),
            precrypt_pubkey: keypair.public()?.to_bytes(),
            sol_pubkey: wallet.as_bytes().to_vec(),
            sol_signed_message: signature,
        };

        let response: KeyResponse = ctx.client.call(request).await?;
        write_json(&self.output, &response.decryption_keys)?;

        Ok(format!(
            "file cid: {}\nfile: {}.{}\ndecryption keys: {}",
            response.file_cid,
            response.file_name,
            response.file_extension,
            self.output.display()
        ))
    }
}
