use clap::{Args, Subcommand};

pub mod request;
pub mod store;

use crate::cli::op::Op;

crate::command_enum! {
    (Store, store::Store),
    (Request, request::Request),
}

// Rename the generated Command to KeyCommand for clarity
pub type KeyCommand = Command;

/// Store and request keys on a running daemon
#[derive(Args, Debug, Clone)]
pub struct Key {
    #[command(subcommand)]
    pub command: KeyCommand,
}

#[async_trait::async_trait]
impl Op for Key {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
