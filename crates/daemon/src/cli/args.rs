pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "precrypt")]
#[command(about = "Token-gated proxy re-encryption for files on IPFS")]
pub struct Args {
    /// Daemon API URL (defaults to localhost on the configured api_port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the precrypt state directory (defaults to ~/.precrypt)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
