use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{DistributorError, Result};

/// Environment variable holding the deployer's signing key
pub const PRIVATE_KEY_ENV: &str = "DEPLOYER_PRIVATE_KEY";
/// Environment variable that may supply the explorer API key
pub const EXPLORER_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chain: Option<ChainConfig>,
    pub faucet: Option<FaucetConfig>,
    #[serde(default)]
    pub distribution: DistributionConfig,
    pub explorer: Option<ExplorerConfig>,
    pub snapshot: Option<SnapshotConfig>,
    pub tiers: Option<TiersConfig>,
    pub owners: Option<OwnersConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    pub address: Address,
    pub token_address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
    #[serde(default = "default_batch_size")]
    pub initial_batch_size: usize,
    #[serde(default = "default_gas_buffer")]
    pub gas_buffer: u64,
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            initial_batch_size: default_batch_size(),
            gas_buffer: default_gas_buffer(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
            transport_retries: default_transport_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "default_explorer_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Sent as `chainid`, required by the multichain v2 endpoint
    pub chain_id: Option<u64>,
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
}

// Keeps the API key out of logs.
impl fmt::Debug for ExplorerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplorerConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("chain_id", &self.chain_id)
            .field("request_delay_ms", &self.request_delay_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub mavericks_contract: Address,
    pub pandas_contract: Address,
    #[serde(default = "default_pool_mavericks")]
    pub pool_mavericks: u128,
    #[serde(default = "default_pool_pandas")]
    pub pool_pandas: u128,
    #[serde(default = "default_pool_holding")]
    pub pool_holding: u128,
    #[serde(default = "default_reward_per_day")]
    pub reward_per_day: u128,
    #[serde(default = "default_csv_path")]
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersConfig {
    /// Collection lives on mainnet, not on the faucet's chain
    pub rpc_url: String,
    #[serde(default = "default_mainnet_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    pub contract: Address,
    #[serde(default)]
    pub from_block: u64,
    #[serde(default = "default_log_chunk_size")]
    pub log_chunk_size: u64,
    #[serde(default = "default_total_supply")]
    pub total_supply: u64,
    #[serde(default = "default_diamond_bonus")]
    pub diamond_bonus: u64,
    #[serde(default = "default_blocks_per_year")]
    pub blocks_per_year: u64,
    #[serde(default = "default_tiers_output")]
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnersConfig {
    pub rpc_url: String,
    #[serde(default = "default_mainnet_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    pub contract: Address,
    #[serde(default = "default_owners_output")]
    pub output_path: String,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_csv_path() -> String {
    "mav_distribution.csv".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_gas_buffer() -> u64 {
    10_000
}

fn default_confirmation_timeout() -> u64 {
    300
}

fn default_receipt_poll_interval() -> u64 {
    2_000
}

fn default_transport_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    1_000
}

fn default_explorer_url() -> String {
    "https://api.etherscan.io/api".to_string()
}

fn default_request_delay() -> u64 {
    200
}

fn default_pool_mavericks() -> u128 {
    200_000_000
}

fn default_pool_pandas() -> u128 {
    100_000_000
}

fn default_pool_holding() -> u128 {
    200_000_000
}

fn default_reward_per_day() -> u128 {
    100
}

fn default_mainnet_chain_id() -> u64 {
    1
}

fn default_log_chunk_size() -> u64 {
    50_000
}

fn default_total_supply() -> u64 {
    13_240_000
}

fn default_diamond_bonus() -> u64 {
    10_000
}

fn default_blocks_per_year() -> u64 {
    2_300_000
}

fn default_tiers_output() -> String {
    "mav_rewards.json".to_string()
}

fn default_owners_output() -> String {
    "unique_wallet_addresses.csv".to_string()
}

impl Config {
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            DistributorError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| DistributorError::Configuration(format!("Failed to parse config: {}", e)))?;

        if let Some(explorer) = config.explorer.as_mut() {
            if explorer.api_key.is_empty() {
                explorer.api_key = std::env::var(EXPLORER_API_KEY_ENV).unwrap_or_default();
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.distribution.initial_batch_size == 0 {
            return Err(DistributorError::Configuration(
                "distribution.initial_batch_size must be at least 1".to_string(),
            ));
        }
        if let Some(tiers) = &self.tiers {
            if tiers.log_chunk_size == 0 || tiers.blocks_per_year == 0 {
                return Err(DistributorError::Configuration(
                    "tiers.log_chunk_size and tiers.blocks_per_year must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn chain(&self) -> Result<&ChainConfig> {
        self.chain
            .as_ref()
            .ok_or_else(|| DistributorError::Configuration("missing `chain` section".to_string()))
    }

    pub fn faucet(&self) -> Result<&FaucetConfig> {
        self.faucet
            .as_ref()
            .ok_or_else(|| DistributorError::Configuration("missing `faucet` section".to_string()))
    }

    pub fn explorer(&self) -> Result<&ExplorerConfig> {
        self.explorer
            .as_ref()
            .ok_or_else(|| DistributorError::Configuration("missing `explorer` section".to_string()))
    }

    pub fn snapshot(&self) -> Result<&SnapshotConfig> {
        self.snapshot
            .as_ref()
            .ok_or_else(|| DistributorError::Configuration("missing `snapshot` section".to_string()))
    }

    pub fn tiers(&self) -> Result<&TiersConfig> {
        self.tiers
            .as_ref()
            .ok_or_else(|| DistributorError::Configuration("missing `tiers` section".to_string()))
    }

    pub fn owners(&self) -> Result<&OwnersConfig> {
        self.owners
            .as_ref()
            .ok_or_else(|| DistributorError::Configuration("missing `owners` section".to_string()))
    }
}

/// Read the deployer signing key from the environment
pub fn private_key_from_env() -> Result<String> {
    match std::env::var(PRIVATE_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(DistributorError::Configuration(format!(
            "Please set {} environment variable",
            PRIVATE_KEY_ENV
        ))),
    }
}
