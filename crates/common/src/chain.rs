use async_trait::async_trait;

use crate::crypto::WalletPublicKey;
use crate::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain rpc unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected chain rpc response: {0}")]
    InvalidResponse(String),
}

impl Classify for ChainError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Rpc
    }
}

/// Read-only view of on-chain token balances.
#[async_trait]
pub trait ChainState: Send + Sync + std::fmt::Debug {
    /// Total balance of `mint` held across all of `account`'s token accounts.
    async fn token_balance(&self, account: &WalletPublicKey, mint: &str)
        -> Result<u64, ChainError>;
}
