//! Provider configuration and management

use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::{Client as HttpClient, Url};
use alloy::transports::http::Http;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ChainConfig;
use crate::error::{DistributorError, Result};

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// RPC endpoint URL (HTTP)
    pub rpc_url: String,
    /// Chain ID
    pub chain_id: u64,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    30
}

impl From<&ChainConfig> for ProviderConfig {
    fn from(chain: &ChainConfig) -> Self {
        Self {
            rpc_url: chain.rpc_url.clone(),
            chain_id: chain.chain_id,
            timeout_seconds: chain.request_timeout_secs,
        }
    }
}

/// Provider builder and manager
#[derive(Clone)]
pub struct ProviderManager {
    config: ProviderConfig,
    provider: DynProvider,
    signer: Option<PrivateKeySigner>,
}

impl ProviderManager {
    /// Create a read-only provider manager
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Self::rpc_client(&config)?;
        let provider = ProviderBuilder::new().connect_client(client).erased();

        Ok(Self {
            config,
            provider,
            signer: None,
        })
    }

    /// Attach a signer. Nonce, gas and gas price are always set by the
    /// caller, so only the chain id and the wallet are filled in.
    pub fn with_signer(mut self, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| DistributorError::Configuration(format!("Invalid private key: {}", e)))?;

        let wallet = EthereumWallet::from(signer.clone());
        let client = Self::rpc_client(&self.config)?;

        self.provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .with_chain_id(self.config.chain_id)
            .wallet(wallet)
            .connect_client(client)
            .erased();
        self.signer = Some(signer);

        Ok(self)
    }

    fn rpc_client(config: &ProviderConfig) -> Result<RpcClient> {
        let url: Url = config
            .rpc_url
            .parse()
            .map_err(|e| DistributorError::Configuration(format!("Invalid RPC URL: {}", e)))?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DistributorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let transport = Http::with_client(http_client, url);
        Ok(RpcClient::new(transport, false))
    }

    /// Get the provider
    pub fn provider(&self) -> DynProvider {
        self.provider.clone()
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Get provider configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Check connection to the RPC endpoint
    pub async fn check_connection(&self) -> Result<u64> {
        let block_number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| DistributorError::Configuration(format!(
                "Failed to connect to {}: {}",
                self.config.rpc_url, e
            )))?;

        Ok(block_number)
    }

    /// Get signer address (if a signer is configured)
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}
