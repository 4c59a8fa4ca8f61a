//! Current holders of an enumerable ERC-721 collection
//!
//! Token ids `0..totalSupply()` are queried one by one with `ownerOf`. Ids
//! that revert (burned or never minted) are skipped.

use alloy::providers::DynProvider;
use alloy_primitives::{Address, U256};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::contract::IERC721;
use crate::error::{DistributorError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolderSnapshot {
    pub owners: BTreeSet<Address>,
    /// Ids whose `ownerOf` call failed
    pub missing_tokens: Vec<U256>,
}

pub async fn collect_owners(provider: &DynProvider, contract: Address) -> Result<HolderSnapshot> {
    let collection = IERC721::new(contract, provider.clone());

    let total_supply = collection.totalSupply().call().await.map_err(|e| {
        DistributorError::ContractCall(format!(
            "totalSupply() not available on {}, token id range unknown: {}",
            contract, e
        ))
    })?;
    info!("Collection {} reports total supply {}", contract, total_supply);

    let mut snapshot = HolderSnapshot::default();
    let mut token_id = U256::ZERO;

    while token_id < total_supply {
        match collection.ownerOf(token_id).call().await {
            Ok(owner) => {
                debug!("Token {}: {}", token_id, owner);
                snapshot.owners.insert(owner);
            }
            Err(e) => {
                warn!("Token {} not found or burned: {}", token_id, e);
                snapshot.missing_tokens.push(token_id);
            }
        }
        token_id += U256::from(1);
    }

    info!(
        "{} unique owners, {} missing tokens",
        snapshot.owners.len(),
        snapshot.missing_tokens.len()
    );
    Ok(snapshot)
}
