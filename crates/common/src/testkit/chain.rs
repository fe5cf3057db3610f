use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::chain::{ChainError, ChainState};
use crate::crypto::WalletPublicKey;

#[derive(Debug, Default)]
pub struct MemoryChain {
    balances: Mutex<HashMap<(WalletPublicKey, String), u64>>,
    unavailable: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryChain {
    pub fn set_balance(&self, account: &WalletPublicKey, mint: &str, amount: u64) {
        self.balances
            .lock()
            .insert((*account, mint.to_string()), amount);
    }

    /// Make every query fail as if the RPC endpoint were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of balance queries answered or refused so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainState for MemoryChain {
    async fn token_balance(
        &self,
        account: &WalletPublicKey,
        mint: &str,
    ) -> Result<u64, ChainError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("memory chain is offline".into()));
        }
        Ok(self
            .balances
            .lock()
            .get(&(*account, mint.to_string()))
            .copied()
            .unwrap_or(0))
    }
}
