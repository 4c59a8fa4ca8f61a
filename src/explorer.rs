//! Block explorer (Etherscan-compatible) NFT transfer history client

use alloy_primitives::{Address, U256};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ExplorerConfig;
use crate::error::{DistributorError, Result};

// Response envelope
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNftTransfer {
    block_number: String,
    time_stamp: String,
    from: String,
    to: String,
    #[serde(rename = "tokenID")]
    token_id: String,
}

/// One ERC-721 transfer as reported by the explorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftTransfer {
    pub token_id: U256,
    pub from: Address,
    pub to: Address,
    pub timestamp: u64,
    pub block_number: u64,
}

impl NftTransfer {
    pub fn is_mint(&self) -> bool {
        self.from == Address::ZERO
    }
}

impl TryFrom<RawNftTransfer> for NftTransfer {
    type Error = DistributorError;

    fn try_from(raw: RawNftTransfer) -> Result<Self> {
        let bad = |field: &str, value: &str| {
            DistributorError::Explorer(format!("invalid {} '{}' in transfer record", field, value))
        };

        Ok(Self {
            token_id: U256::from_str_radix(&raw.token_id, 10).map_err(|_| bad("tokenID", &raw.token_id))?,
            from: raw.from.parse().map_err(|_| bad("from", &raw.from))?,
            to: raw.to.parse().map_err(|_| bad("to", &raw.to))?,
            timestamp: raw.time_stamp.parse().map_err(|_| bad("timeStamp", &raw.time_stamp))?,
            block_number: raw.block_number.parse().map_err(|_| bad("blockNumber", &raw.block_number))?,
        })
    }
}

pub struct ExplorerClient {
    client: Client,
    config: ExplorerConfig,
}

impl ExplorerClient {
    pub fn new(config: ExplorerConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(DistributorError::Configuration(format!(
                "explorer API key missing, set explorer.api_key or {}",
                crate::config::EXPLORER_API_KEY_ENV
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DistributorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch the full NFT transfer history of a collection, oldest first
    pub async fn fetch_nft_transfers(&self, contract: Address) -> Result<Vec<NftTransfer>> {
        let contract = format!("{:#x}", contract);
        let mut params: Vec<(&str, String)> = vec![
            ("module", "account".to_string()),
            ("action", "tokennfttx".to_string()),
            ("contractaddress", contract.clone()),
            ("startblock", "0".to_string()),
            ("endblock", "99999999".to_string()),
            ("sort", "asc".to_string()),
            ("apikey", self.config.api_key.clone()),
        ];
        if let Some(chain_id) = self.config.chain_id {
            params.push(("chainid", chain_id.to_string()));
        }

        debug!("Requesting NFT transfers for {}", contract);

        let response = self
            .client
            .get(&self.config.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| DistributorError::Explorer(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DistributorError::Explorer(format!(
                "HTTP {} from {}",
                response.status(),
                self.config.api_url
            )));
        }

        let body: ExplorerResponse = response
            .json()
            .await
            .map_err(|e| DistributorError::Explorer(format!("malformed response: {}", e)))?;

        let transfers = match body.result {
            serde_json::Value::Array(_) => {
                let raw: Vec<RawNftTransfer> = serde_json::from_value(body.result)?;
                raw.into_iter()
                    .map(NftTransfer::try_from)
                    .collect::<Result<Vec<_>>>()?
            }
            other => {
                let detail = match other {
                    serde_json::Value::String(s) => s,
                    value => value.to_string(),
                };
                return Err(DistributorError::Explorer(format!("{} ({})", detail, body.message)));
            }
        };

        info!("Fetched {} transfers for {}", transfers.len(), contract);

        if self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }

        Ok(transfers)
    }
}
