//! Configuration management for ReportChain

use crate::error::ChainError;
use crate::miner::ProofSearch;
use crate::persistence::{Database, InMemoryPersistence, JsonFileStore, Persistence};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    pub fn open(&self) -> Result<Arc<dyn Persistence>, ChainError> {
        let persistence: Arc<dyn Persistence> = match self.backend {
            StorageBackend::Json => Arc::new(JsonFileStore::new(&self.path)),
            StorageBackend::Sqlite => {
                if let Some(parent) = Path::new(&self.path).parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                Arc::new(Database::open(&self.path)?)
            }
            StorageBackend::Memory => Arc::new(InMemoryPersistence::new()),
        };
        Ok(persistence)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MinerConfig {
    /// 0 leaves the proof search unbounded.
    #[serde(default)]
    pub max_attempts: u64,
}

impl MinerConfig {
    pub fn proof_search(&self) -> ProofSearch {
        ProofSearch::unbounded().with_max_attempts(self.max_attempts)
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ChainError> {
        if self.storage.backend != StorageBackend::Memory && self.storage.path.trim().is_empty() {
            return Err(ChainError::ConfigError(
                "storage.path must be set for json and sqlite backends".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a `PORT` override. An unparsable value is a config error.
    pub fn with_port_override(mut self, port: Option<&str>) -> Result<Self, ChainError> {
        if let Some(raw) = port {
            self.api.port = raw
                .trim()
                .parse()
                .map_err(|_| ChainError::ConfigError(format!("invalid PORT value {:?}", raw)))?;
        }
        Ok(self)
    }
}

/// Read `./config.toml`, falling back to defaults when it is absent. A `PORT`
/// environment variable overrides `api.port`.
pub fn load_config() -> Result<Config, ChainError> {
    let path = Path::new("config.toml");
    let config = if path.exists() {
        load_config_from(path)?
    } else {
        Config::default()
    };

    config.with_port_override(std::env::var("PORT").ok().as_deref())
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = fs::read_to_string(path)?;
    Config::from_toml_str(&config_str)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_storage_path() -> String {
    "./data/blockchain.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 5000);
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.storage.path, "./data/blockchain.json");
        assert_eq!(config.miner.proof_search().max_attempts(), None);
    }

    #[test]
    fn test_full_document() {
        let config = Config::from_toml_str(
            r#"
            [api]
            host = "0.0.0.0"
            port = 8080

            [storage]
            backend = "sqlite"
            path = "/var/lib/reportchain/chain.db"

            [miner]
            max_attempts = 5000000
            "#,
        )
        .unwrap();
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.miner.proof_search().max_attempts(), Some(5_000_000));
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = Config::from_toml_str("[storage]\npath = \"\"").unwrap_err();
        assert!(matches!(err, ChainError::ConfigError(_)));
        assert!(Config::from_toml_str("[storage]\nbackend = \"memory\"\npath = \"\"").is_ok());
    }

    #[test]
    fn test_port_override() {
        let config = Config::default().with_port_override(Some("8081")).unwrap();
        assert_eq!(config.api.port, 8081);
        let config = Config::default().with_port_override(None).unwrap();
        assert_eq!(config.api.port, 5000);
        let err = Config::default().with_port_override(Some("http")).unwrap_err();
        assert!(matches!(err, ChainError::ConfigError(_)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Config::from_toml_str("[storage]\nbackend = \"redis\"").is_err());
    }
}
