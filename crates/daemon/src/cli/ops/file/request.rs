use clap::Args;

use common::crypto::{WalletError, WalletPublicKey};
use precrypt_daemon::http_server::api::client::ApiError;
use precrypt_daemon::http_server::api::v0::file::{FileRequest, FileRequestResponse};

#[derive(Args, Debug, Clone)]
pub struct Request {
    /// Identifier of the stored key
    #[arg(long)]
    pub key_cid: String,

    /// Wallet public key, base58
    #[arg(long)]
    pub wallet: String,

    /// Wallet signature over the proxy's challenge, base58
    #[arg(long)]
    pub signature: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FileRequestError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("invalid wallet key: {0}")]
    Wallet(#[from] WalletError),
    #[error("signature is not base58: {0}")]
    Signature(#[from] bs58::decode::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Request {
    type Error = FileRequestError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let wallet = WalletPublicKey::from_base58(&self.wallet)?;
        let request = FileRequest {
            version: 0,
            key_cid: self.key_cid.clone(),
            sol_pubkey: wallet.as_bytes().to_vec(),
            sol_signed_message: bs58::decode(self.signature.trim()).into_vec()?,
        };

        let response: FileRequestResponse = ctx.client.call(request).await?;
        Ok(format!("job: {}", response.uuid))
    }
}
