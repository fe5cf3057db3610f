use clap::Args;

use precrypt_daemon::state::AppState;
use precrypt_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Bearer token for the web3 blob store
    #[arg(long, env = "PRECRYPT_WEB3_TOKEN", hide_env_values = true)]
    pub web3_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] precrypt_daemon::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // Load state from config path (or default ~/.precrypt)
        let state = AppState::load(ctx.config_path.clone())?;
        let seal_key = state.load_seal_key()?;

        let mut config = ServiceConfig::from_app_state(&state, seal_key);
        if let Some(port) = self.api_port {
            config.api_port = port;
        }
        config.log_dir = self.log_dir.clone();
        config.web3_token = self.web3_token.clone();

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
