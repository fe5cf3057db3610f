use clap::{Args, Subcommand};

pub mod fetch;
pub mod request;
pub mod status;
pub mod store;

use crate::cli::op::Op;

crate::command_enum! {
    (Store, store::Store),
    (Status, status::Status),
    (Fetch, fetch::Fetch),
    (Request, request::Request),
}

// Rename the generated Command to FileCommand for clarity
pub type FileCommand = Command;

/// Whole-file jobs on a running daemon. The daemon sees the plaintext.
#[derive(Args, Debug, Clone)]
pub struct File {
    #[command(subcommand)]
    pub command: FileCommand,
}

#[async_trait::async_trait]
impl Op for File {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
