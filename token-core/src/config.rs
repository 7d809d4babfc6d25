//! Configuration for a token deployment

use crate::types::{AccountId, Balance, FeatureFlags, TokenMetadata};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Token deployment parameters
    pub token: TokenConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "token-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            token: TokenConfig::default(),
            storage: StorageConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Token deployment parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token name
    pub name: String,

    /// Token symbol
    pub symbol: String,

    /// Decimals
    pub decimals: u8,

    /// Initial supply in smallest units, minted to the deployer
    #[serde(with = "balance_string")]
    pub initial_supply: Balance,

    /// Development URI of the deployer account (e.g. `//Alice`)
    pub deployer_uri: String,

    /// Owner can pause
    pub pausable: bool,

    /// Owner can mint
    pub mintable: bool,

    /// Holders can burn
    pub burnable: bool,

    /// Timed sale enabled
    #[serde(default)]
    pub sale: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "PepeToken".to_string(),
            symbol: "PEPE".to_string(),
            decimals: 18,
            initial_supply: 100 * 10u128.pow(18),
            deployer_uri: "//Alice".to_string(),
            pausable: true,
            mintable: true,
            burnable: true,
            sale: false,
        }
    }
}

impl TokenConfig {
    /// Capability set described by this config
    pub fn features(&self) -> FeatureFlags {
        FeatureFlags::new(self.pausable, self.mintable, self.burnable).with_sale(self.sale)
    }

    /// Metadata described by this config
    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: Some(self.name.as_bytes().to_vec()),
            symbol: Some(self.symbol.as_bytes().to_vec()),
            decimals: self.decimals,
        }
    }

    /// Deployer account
    pub fn deployer(&self) -> AccountId {
        AccountId::from_uri(&self.deployer_uri)
    }
}

/// Storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps, lost on exit
    Memory,
    /// RocksDB under `data_dir`
    RocksDb,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,

    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// RocksDB tuning
    pub rocksdb: RocksDBConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::RocksDb,
            data_dir: PathBuf::from("./data/token"),
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Bounded mailbox capacity
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("TOKEN_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(backend) = std::env::var("TOKEN_STORAGE_BACKEND") {
            config.storage.backend = match backend.to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "rocksdb" => StorageBackend::RocksDb,
                other => {
                    return Err(crate::Error::Config(format!(
                        "Unknown storage backend: {}",
                        other
                    )))
                }
            };
        }

        if let Ok(name) = std::env::var("TOKEN_NAME") {
            config.token.name = name;
        }

        if let Ok(symbol) = std::env::var("TOKEN_SYMBOL") {
            config.token.symbol = symbol;
        }

        if let Ok(decimals) = std::env::var("TOKEN_DECIMALS") {
            config.token.decimals = decimals
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid TOKEN_DECIMALS: {}", e)))?;
        }

        if let Ok(supply) = std::env::var("TOKEN_INITIAL_SUPPLY") {
            config.token.initial_supply = supply.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid TOKEN_INITIAL_SUPPLY: {}", e))
            })?;
        }

        if let Ok(capacity) = std::env::var("TOKEN_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid TOKEN_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the node cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "Mailbox capacity must be positive".to_string(),
            ));
        }
        if self.token.deployer_uri.is_empty() {
            return Err(crate::Error::Config("Deployer URI is empty".to_string()));
        }
        Ok(())
    }
}

/// u128 amounts as decimal strings (TOML integers are 64-bit)
mod balance_string {
    use crate::types::Balance;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Balance, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.replace('_', "")
            .parse()
            .map_err(serde::de::Error::custom)
    }
}
