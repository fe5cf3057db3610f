use clap::Args;

use common::build_info;

/// Show the precrypt build, optionally alongside the running daemon's
#[derive(Args, Debug, Clone)]
pub struct Version {
    /// Also ask the daemon at --remote which version it runs
    #[arg(long)]
    pub daemon: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("daemon not reachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("daemon sent no version field")]
    MissingVersion,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Version {
    type Error = VersionError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut out = format!("precrypt\n{}", build_info!());
        if !self.daemon {
            return Ok(out);
        }

        let base = ctx.client.base_url();
        let url = format!("{}/_status/version", base.as_str().trim_end_matches('/'));
        let body: serde_json::Value = ctx
            .client
            .http_client()
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let version = body
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or(VersionError::MissingVersion)?;

        let local = build_info!().version;
        out.push_str(&format!("\n\ndaemon ({}): {}", base, version));
        if version != local {
            out.push_str(&format!(" (differs from this CLI, {})", local));
        }
        Ok(out)
    }
}
