use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("one or more dependent services aren't available")]
    DependencyFailure,

    #[error("service has received signal indicating it should shutdown")]
    ShuttingDown,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ready while the job worker is attached and scratch space is usable.
/// The remote collaborators are checked per request, not here.
struct ServiceSource {
    state: ServiceState,
}

#[async_trait]
impl DataSource for ServiceSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        if !self.state.dispatcher().is_connected() {
            tracing::warn!("job worker is gone");
            return Err(DataSourceError::ShuttingDown);
        }
        match tokio::fs::metadata(self.state.work_dir()).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => {
                tracing::warn!(
                    work_dir = %self.state.work_dir().display(),
                    "job work directory unavailable"
                );
                Err(DataSourceError::DependencyFailure)
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(ServiceSource {
            state: state.clone(),
        })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http_server::api::v0::tests::{test_state, test_state_with_queue};

    #[derive(Clone)]
    pub(crate) enum MockReadiness {
        DependencyFailure,
        Ready,
        ShuttingDown,
    }

    #[async_trait]
    impl DataSource for MockReadiness {
        async fn is_ready(&self) -> Result<(), DataSourceError> {
            use MockReadiness::*;

            match self {
                DependencyFailure => Err(DataSourceError::DependencyFailure),
                Ready => Ok(()),
                ShuttingDown => Err(DataSourceError::ShuttingDown),
            }
        }
    }

    #[tokio::test]
    async fn test_ready_with_worker_attached() {
        let (state, _chain, _receiver, _dir) = test_state_with_queue();
        assert!(ServiceSource { state }.is_ready().await.is_ok());
    }

    #[tokio::test]
    async fn test_detached_worker_is_shutting_down() {
        let (state, _chain, _dir) = test_state();
        assert!(matches!(
            ServiceSource { state }.is_ready().await,
            Err(DataSourceError::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn test_missing_work_dir_is_dependency_failure() {
        let (state, _chain, receiver, dir) = test_state_with_queue();
        drop(dir);
        assert!(matches!(
            ServiceSource { state }.is_ready().await,
            Err(DataSourceError::DependencyFailure)
        ));
        drop(receiver);
    }
}
