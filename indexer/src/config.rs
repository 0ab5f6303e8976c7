//! Indexer configuration.
//!
//! All process-level knobs come from the environment: the chain endpoint,
//! the oracle contract address, the store connection string, and the scan
//! pacing parameters. Missing required values are fatal at startup.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default poll interval between head checks, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 12_000;

/// Default maximum block span per log query.
pub const DEFAULT_BATCH_SIZE: u64 = 1_000;

/// Default timeout for a single RPC call, in milliseconds.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 10_000;

/// Configuration for the indexer process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// JSON-RPC endpoint of the chain provider.
    pub rpc_url: String,

    /// Address of the entropy oracle contract (0x-prefixed, 20 bytes).
    pub contract_address: String,

    /// Postgres connection string.
    pub database_url: String,

    /// Block at which the contract was deployed; scanning starts here.
    pub start_block: u64,

    /// Poll interval between head checks, in milliseconds.
    pub poll_interval_ms: u64,

    /// Maximum block span per log query.
    pub batch_size: u64,

    /// Timeout for a single RPC call, in milliseconds.
    pub rpc_timeout_ms: u64,
}

impl IndexerConfig {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or any value
    /// fails to parse or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            rpc_url: required("RPC_URL")?,
            contract_address: required("CONTRACT_ADDRESS")?,
            database_url: required("DATABASE_URL")?,
            start_block: required("START_BLOCK")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("START_BLOCK"))?,
            poll_interval_ms: optional_u64("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            batch_size: optional_u64("BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            rpc_timeout_ms: optional_u64("RPC_TIMEOUT_MS", DEFAULT_RPC_TIMEOUT_MS)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Returns the poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the RPC timeout as a [`Duration`].
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        if !is_address(&self.contract_address) {
            return Err(ConfigError::InvalidContractAddress(
                self.contract_address.clone(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// An environment variable failed to parse.
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),

    /// The contract address is not a 0x-prefixed 20-byte hex string.
    #[error("invalid contract address: {0}")]
    InvalidContractAddress(String),

    /// Batch size must be at least one block.
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    /// Poll interval must be non-zero.
    #[error("poll interval must be greater than zero")]
    InvalidPollInterval,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn optional_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

fn is_address(s: &str) -> bool {
    let Some(hex_part) = s.strip_prefix("0x") else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> IndexerConfig {
        IndexerConfig {
            rpc_url: "http://localhost:8545".into(),
            contract_address: "0x1111111111111111111111111111111111111111".into(),
            database_url: "postgres://localhost/entroscan".into(),
            start_block: 1_000,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = valid_config().with_batch_size(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidBatchSize));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let config = valid_config().with_poll_interval(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPollInterval));
    }

    #[test]
    fn bad_contract_address_rejected() {
        let mut config = valid_config();
        config.contract_address = "not-an-address".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidContractAddress(_))
        ));

        config.contract_address = "0x1234".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidContractAddress(_))
        ));
    }

    #[test]
    fn poll_interval_duration() {
        let config = valid_config().with_poll_interval(250);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }
}
