use axum::Router;

pub mod file;
pub mod key;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/key", key::router(state.clone()))
        .nest("/file", file::router(state.clone()))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use common::cipher::ChunkedCipher;
    use common::crypto::SealKey;
    use common::gate::DEFAULT_CHALLENGE;
    use common::jobs::JobReceiver;
    use common::store::LocalBlobStore;
    use common::testkit::MemoryChain;
    use tempfile::TempDir;

    use crate::ServiceState;

    /// State over an in-memory store and chain. No worker runs; tests drive
    /// jobs by hand.
    pub fn test_state() -> (ServiceState, Arc<MemoryChain>, TempDir) {
        let (state, chain, _receiver, dir) = test_state_with_queue();
        (state, chain, dir)
    }

    /// Like [`test_state`], keeping the job queue open.
    pub fn test_state_with_queue() -> (ServiceState, Arc<MemoryChain>, JobReceiver, TempDir) {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(MemoryChain::default());
        let (state, receiver) = ServiceState::new(
            Arc::new(LocalBlobStore::memory()),
            chain.clone(),
            SealKey::generate().unwrap(),
            DEFAULT_CHALLENGE,
            ChunkedCipher::new(16, 2).unwrap(),
            dir.path().to_path_buf(),
        );
        (state, chain, receiver, dir)
    }
}
