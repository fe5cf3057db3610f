// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op};
use cli::{Daemon, Decrypt, Encrypt, File, Health, Init, Key, Keygen, Recrypt, Version};

command_enum! {
    (Init, Init),
    (Daemon, Daemon),
    (Keygen, Keygen),
    (Encrypt, Encrypt),
    (Recrypt, Recrypt),
    (Decrypt, Decrypt),
    (Key, Key),
    (File, File),
    (Health, Health),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Resolve remote URL: explicit flag > config api_port > default port
    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone());

    // Build context - always has API client initialized
    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
