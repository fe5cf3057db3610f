use std::{fs, path::PathBuf};

use common::crypto::SealKey;
use serde::{Deserialize, Serialize};
use url::Url;

use common::cipher::{DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS};
use common::gate::DEFAULT_CHALLENGE;

use crate::file_jobs::DEFAULT_JOB_TTL;

pub const APP_NAME: &str = "precrypt";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SEAL_KEY_FILE_NAME: &str = "seal.key";
pub const BLOBS_DIR_NAME: &str = "blobs";
pub const WORK_DIR_NAME: &str = "jobs";

pub const DEFAULT_RPC_URL: &str = "https://api.testnet.solana.com/";
pub const DEFAULT_WEB3_API_URL: &str = "https://api.web3.storage/";
pub const DEFAULT_IPFS_GATEWAY: &str = "https://dweb.link/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Solana JSON-RPC endpoint used for balance checks
    #[serde(default = "default_rpc_url")]
    pub rpc_url: Url,
    /// Message requesters sign to prove wallet ownership
    #[serde(default = "default_challenge")]
    pub challenge: String,
    /// Chunk size for whole-file jobs
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Worker threads per whole-file job
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seconds finished whole-file jobs and their results are kept
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
}

fn default_api_port() -> u16 {
    3000
}

fn default_rpc_url() -> Url {
    Url::parse(DEFAULT_RPC_URL).expect("hardcoded URL must parse")
}

fn default_challenge() -> String {
    DEFAULT_CHALLENGE.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_job_ttl_secs() -> u64 {
    DEFAULT_JOB_TTL.as_secs()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            rpc_url: default_rpc_url(),
            challenge: default_challenge(),
            chunk_size: default_chunk_size(),
            workers: default_workers(),
            job_ttl_secs: default_job_ttl_secs(),
            blob_store: BlobStoreConfig::default(),
        }
    }
}

/// Where key bundles and ciphertexts are published.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    /// iroh-blobs store under the state directory (default)
    #[default]
    Local,

    /// In-memory iroh-blobs store, lost on restart
    Memory,

    /// web3.storage uploads with reads through an IPFS gateway.
    /// The API token is never written to disk; it comes from
    /// `--web3-token` or `PRECRYPT_WEB3_TOKEN` at startup.
    Web3 {
        #[serde(default = "default_web3_api_url")]
        api_url: Url,
        #[serde(default = "default_gateway_url")]
        gateway_url: Url,
    },
}

impl BlobStoreConfig {
    /// web3.storage with the public endpoints.
    pub fn web3() -> Self {
        BlobStoreConfig::Web3 {
            api_url: default_web3_api_url(),
            gateway_url: default_gateway_url(),
        }
    }
}

fn default_web3_api_url() -> Url {
    Url::parse(DEFAULT_WEB3_API_URL).expect("hardcoded URL must parse")
}

fn default_gateway_url() -> Url {
    Url::parse(DEFAULT_IPFS_GATEWAY).expect("hardcoded URL must parse")
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.precrypt)
    pub precrypt_dir: PathBuf,
    /// Path to the proxy's sealing key
    pub seal_key_path: PathBuf,
    /// Path to the local blobs directory
    pub blobs_path: PathBuf,
    /// Scratch space for whole-file jobs
    pub work_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.precrypt)
    pub fn precrypt_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let precrypt_dir = Self::precrypt_dir(custom_path)?;

        if precrypt_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&precrypt_dir)?;

        let blobs_path = precrypt_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;
        let work_dir = precrypt_dir.join(WORK_DIR_NAME);
        fs::create_dir_all(&work_dir)?;

        // Generate and save the sealing key
        let seal_key = SealKey::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let seal_key_path = precrypt_dir.join(SEAL_KEY_FILE_NAME);
        write_secret(&seal_key_path, &seal_key.to_hex())?;

        let config = config.unwrap_or_default();
        let config_path = precrypt_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            precrypt_dir,
            seal_key_path,
            blobs_path,
            work_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let precrypt_dir = Self::precrypt_dir(custom_path)?;

        if !precrypt_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let seal_key_path = precrypt_dir.join(SEAL_KEY_FILE_NAME);
        let blobs_path = precrypt_dir.join(BLOBS_DIR_NAME);
        let work_dir = precrypt_dir.join(WORK_DIR_NAME);
        let config_path = precrypt_dir.join(CONFIG_FILE_NAME);

        if !seal_key_path.exists() {
            return Err(StateError::MissingFile(SEAL_KEY_FILE_NAME.to_string()));
        }
        if !blobs_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOBS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        // Job scratch space is disposable
        fs::create_dir_all(&work_dir)?;

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            precrypt_dir,
            seal_key_path,
            blobs_path,
            work_dir,
            config_path,
            config,
        })
    }

    /// Load the sealing key from the key file
    pub fn load_seal_key(&self) -> Result<SealKey, StateError> {
        let hex = fs::read_to_string(&self.seal_key_path)?;
        SealKey::from_hex(&hex).map_err(|e| StateError::InvalidKey(e.to_string()))
    }
}

#[cfg(unix)]
fn write_secret(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_secret(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
    fs::write(path, contents)
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("precrypt directory not initialized. Run 'precrypt init' first")]
    NotInitialized,

    #[error("precrypt directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("state");

        let created = AppState::init(Some(dir.clone()), None).unwrap();
        let loaded = AppState::load(Some(dir.clone())).unwrap();

        assert_eq!(loaded.config.api_port, created.config.api_port);
        assert_eq!(loaded.config.challenge, DEFAULT_CHALLENGE);
        assert!(loaded.work_dir.is_dir());
        assert_eq!(
            loaded.load_seal_key().unwrap().to_hex(),
            created.load_seal_key().unwrap().to_hex()
        );
    }

    #[test]
    fn test_init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("state");
        AppState::init(Some(dir.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(tmp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_load_missing_seal_key() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("state");
        let state = AppState::init(Some(dir.clone()), None).unwrap();
        fs::remove_file(state.seal_key_path).unwrap();
        assert!(matches!(
            AppState::load(Some(dir)),
            Err(StateError::MissingFile(_))
        ));
    }

    #[test]
    fn test_web3_config_round_trip() {
        let toml = r#"
            api_port = 8000

            [blob_store]
            type = "web3"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.job_ttl_secs, DEFAULT_JOB_TTL.as_secs());
        match config.blob_store {
            BlobStoreConfig::Web3 { api_url, .. } => {
                assert_eq!(api_url.as_str(), DEFAULT_WEB3_API_URL)
            }
            other => panic!("unexpected blob store {:?}", other),
        }
    }
}
