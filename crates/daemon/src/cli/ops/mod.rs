pub mod daemon;
pub mod decrypt;
pub mod encrypt;
pub mod file;
pub mod health;
pub mod init;
pub mod key;
pub mod keygen;
pub mod recrypt;
pub mod version;

pub use daemon::Daemon;
pub use decrypt::Decrypt;
pub use encrypt::Encrypt;
pub use file::File;
pub use health::Health;
pub use init::Init;
pub use key::Key;
pub use keygen::Keygen;
pub use recrypt::Recrypt;
pub use version::Version;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read a JSON artifact (keypair, key bundle) from disk.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|e| ArtifactError::Io(path.display().to_string(), e))?;
    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Json(path.display().to_string(), e))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| ArtifactError::Json(path.display().to_string(), e))?;
    std::fs::write(path, json).map_err(|e| ArtifactError::Io(path.display().to_string(), e))
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("{0}: invalid JSON: {1}")]
    Json(String, #[source] serde_json::Error),
}
