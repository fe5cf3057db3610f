//! In-process stand-ins for the proxy's collaborators.
//!
//! [`MemoryChain`] answers balance queries from a table and can be switched
//! into an outage. [`TestWallet`] plays the client-side wallet signer.
//!
//! ```rust,ignore
//! use common::testkit::{MemoryChain, TestWallet};
//!
//! let wallet = TestWallet::generate();
//! let chain = MemoryChain::default();
//! chain.set_balance(&wallet.public(), "mint", 1);
//! let signed = wallet.sign(b"precrypt");
//! ```

mod chain;
mod wallet;

pub use chain::MemoryChain;
pub use wallet::TestWallet;
