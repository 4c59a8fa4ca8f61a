//! ERC-721 `Transfer` log retrieval over RPC

use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;
use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::contract::IERC721;
use crate::error::{DistributorError, Result};

/// A decoded `Transfer` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub token_id: U256,
    pub from: Address,
    pub to: Address,
    pub block_number: u64,
    pub log_index: u64,
}

impl TransferRecord {
    pub fn is_mint(&self) -> bool {
        self.from == Address::ZERO
    }
}

/// Inclusive block ranges of at most `chunk` blocks covering `from..=to`
pub fn block_ranges(from: u64, to: u64, chunk: u64) -> Vec<(u64, u64)> {
    let chunk = chunk.max(1);
    let mut ranges = Vec::new();
    let mut start = from;

    while start <= to {
        let end = start.saturating_add(chunk - 1).min(to);
        ranges.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }

    ranges
}

/// Fetch every `Transfer` of `contract` between `from_block` and `to_block`
pub async fn fetch_transfers(
    provider: &DynProvider,
    contract: Address,
    from_block: u64,
    to_block: u64,
    chunk: u64,
) -> Result<Vec<TransferRecord>> {
    let ranges = block_ranges(from_block, to_block, chunk);
    info!(
        "Fetching Transfer logs of {} over blocks {}..={} in {} chunks",
        contract,
        from_block,
        to_block,
        ranges.len()
    );

    let mut records = Vec::new();

    for (start, end) in ranges {
        let filter = Filter::new()
            .address(contract)
            .event_signature(IERC721::Transfer::SIGNATURE_HASH)
            .from_block(start)
            .to_block(end);

        let logs = provider
            .get_logs(&filter)
            .await
            .map_err(|e| DistributorError::Provider(format!("get_logs {}..={} failed: {}", start, end, e)))?;

        debug!("Blocks {}..={}: {} logs", start, end, logs.len());

        for log in logs {
            let Some(block_number) = log.block_number else {
                warn!("Skipping pending log without block number");
                continue;
            };
            let log_index = log.log_index.unwrap_or_default();

            match log.log_decode::<IERC721::Transfer>() {
                Ok(decoded) => {
                    let event = decoded.inner.data;
                    records.push(TransferRecord {
                        token_id: event.tokenId,
                        from: event.from,
                        to: event.to,
                        block_number,
                        log_index,
                    });
                }
                Err(e) => warn!("Skipping undecodable Transfer log at block {}: {}", block_number, e),
            }
        }
    }

    records.sort_by_key(|r| (r.block_number, r.log_index));
    Ok(records)
}
