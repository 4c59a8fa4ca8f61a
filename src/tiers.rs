//! Tiered holding rewards derived from on-chain transfer history

use alloy_primitives::{Address, U256};
use std::collections::BTreeMap;

use crate::config::TiersConfig;
use crate::events::TransferRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierParams {
    pub total_supply: u64,
    pub diamond_bonus: u64,
    pub blocks_per_year: u64,
}

impl From<&TiersConfig> for TierParams {
    fn from(config: &TiersConfig) -> Self {
        Self {
            total_supply: config.total_supply,
            diamond_bonus: config.diamond_bonus,
            blocks_per_year: config.blocks_per_year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHistory {
    pub owner: Address,
    /// Blocks of every transfer that was not a mint
    pub secondary_transfers: Vec<u64>,
}

impl TokenHistory {
    pub fn is_diamond(&self) -> bool {
        self.secondary_transfers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierRewards {
    pub rewards: BTreeMap<U256, u64>,
    pub diamond_count: usize,
    pub scaled: bool,
}

/// Replay transfers (in chain order) into per-token histories
pub fn token_histories(transfers: &[TransferRecord]) -> BTreeMap<U256, TokenHistory> {
    let mut histories: BTreeMap<U256, TokenHistory> = BTreeMap::new();

    for transfer in transfers {
        let history = histories.entry(transfer.token_id).or_insert(TokenHistory {
            owner: transfer.to,
            secondary_transfers: Vec::new(),
        });
        history.owner = transfer.to;
        if !transfer.is_mint() {
            history.secondary_transfers.push(transfer.block_number);
        }
    }

    histories
}

/// Reward tier for a holding period measured in blocks
pub fn holding_reward(holding_blocks: u64, blocks_per_year: u64) -> u64 {
    let blocks = holding_blocks as u128;
    let year = blocks_per_year as u128;

    if blocks >= 3 * year {
        5_000
    } else if blocks >= 2 * year {
        3_000
    } else if blocks >= year {
        1_500
    } else if 2 * blocks >= year {
        500
    } else {
        0
    }
}

/// Diamond tokens get the fixed bonus; the others get a holding tier counted
/// from their first secondary transfer, scaled down to fit what the bonus
/// leaves of the total supply.
pub fn compute_rewards(
    histories: &BTreeMap<U256, TokenHistory>,
    current_block: u64,
    params: &TierParams,
) -> TierRewards {
    let mut result = TierRewards::default();
    let mut non_diamond: Vec<(U256, u64)> = Vec::new();

    for (token_id, history) in histories {
        match history.secondary_transfers.first() {
            None => {
                result.rewards.insert(*token_id, params.diamond_bonus);
                result.diamond_count += 1;
            }
            Some(first_transfer) => {
                let holding = current_block.saturating_sub(*first_transfer);
                non_diamond.push((*token_id, holding_reward(holding, params.blocks_per_year)));
            }
        }
    }

    let diamond_total = (result.diamond_count as u128) * (params.diamond_bonus as u128);
    let remaining = (params.total_supply as u128).saturating_sub(diamond_total);
    let non_diamond_total: u128 = non_diamond.iter().map(|(_, r)| *r as u128).sum();

    result.scaled = non_diamond_total > remaining;

    for (token_id, reward) in non_diamond {
        let reward = if result.scaled {
            (reward as u128 * remaining / non_diamond_total) as u64
        } else {
            reward
        };
        result.rewards.insert(token_id, reward);
    }

    result
}

/// Sum token rewards per current owner
pub fn rewards_by_owner(
    histories: &BTreeMap<U256, TokenHistory>,
    rewards: &TierRewards,
) -> BTreeMap<Address, u128> {
    let mut owners: BTreeMap<Address, u128> = BTreeMap::new();

    for (token_id, reward) in &rewards.rewards {
        if let Some(history) = histories.get(token_id) {
            *owners.entry(history.owner).or_default() += *reward as u128;
        }
    }

    owners
}

/// Token id (decimal) to reward, for the JSON report
pub fn rewards_json(rewards: &TierRewards) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = rewards
        .rewards
        .iter()
        .map(|(token_id, reward)| (token_id.to_string(), serde_json::Value::from(*reward)))
        .collect();
    serde_json::Value::Object(map)
}
