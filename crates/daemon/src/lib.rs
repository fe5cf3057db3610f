// Service modules (daemon functionality)
pub mod blobs;
pub mod file_jobs;
pub mod http_server;
pub mod process;
pub mod service_config;
pub mod service_state;
pub mod solana;

// App state (configuration, paths)
pub mod state;

// Re-exports for the binary and integration tests
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{AppConfig, AppState, BlobStoreConfig, StateError};
