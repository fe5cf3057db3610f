use clap::Args;
use url::Url;

use precrypt_daemon::state::{AppConfig, AppState, BlobStoreConfig, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port for the API server
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Solana JSON-RPC endpoint for balance checks
    #[arg(long)]
    pub rpc_url: Option<Url>,

    /// Blob store backend: local, memory or web3
    #[arg(long, default_value = "local")]
    pub blob_store: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("unknown blob store {0:?} (expected local, memory or web3)")]
    UnknownBlobStore(String),
}

fn blob_store_config(name: &str) -> Result<BlobStoreConfig, InitError> {
    match name {
        "local" => Ok(BlobStoreConfig::Local),
        "memory" => Ok(BlobStoreConfig::Memory),
        "web3" => Ok(BlobStoreConfig::web3()),
        other => Err(InitError::UnknownBlobStore(other.to_string())),
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            api_port: self.api_port.unwrap_or(defaults.api_port),
            rpc_url: self.rpc_url.clone().unwrap_or(defaults.rpc_url.clone()),
            blob_store: blob_store_config(&self.blob_store)?,
            ..defaults
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let mut lines = vec![
            format!("Initialized precrypt at {}", state.precrypt_dir.display()),
            format!("  config:   {}", state.config_path.display()),
            format!("  seal key: {}", state.seal_key_path.display()),
            format!("  api_port: {}", state.config.api_port),
        ];
        if matches!(state.config.blob_store, BlobStoreConfig::Web3 { .. }) {
            lines.push("  web3 token: pass --web3-token or set PRECRYPT_WEB3_TOKEN".to_string());
        }
        Ok(lines.join("\n"))
    }
}
