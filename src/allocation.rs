//! Explorer-based reward snapshot
//!
//! A diamond paw is a token that was minted and never moved afterwards. Each
//! collection's diamond-paw pool is split equally between the wallets holding
//! such tokens, and the holding pool is split in proportion to the days since
//! each wallet's mint.

use alloy_primitives::{Address, U256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::SnapshotConfig;
use crate::explorer::NftTransfer;

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiamondPaws {
    pub wallets: BTreeSet<Address>,
    /// Most recent diamond-paw mint per wallet
    pub mint_times: BTreeMap<Address, u64>,
}

impl DiamondPaws {
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotParams {
    pub pool_mavericks: u128,
    pub pool_pandas: u128,
    pub pool_holding: u128,
    pub reward_per_day: u128,
}

impl From<&SnapshotConfig> for SnapshotParams {
    fn from(config: &SnapshotConfig) -> Self {
        Self {
            pool_mavericks: config.pool_mavericks,
            pool_pandas: config.pool_pandas,
            pool_holding: config.pool_holding,
            reward_per_day: config.reward_per_day,
        }
    }
}

/// Collect minting wallets of tokens that never left them
pub fn identify_diamond_paws(transfers: &[NftTransfer]) -> DiamondPaws {
    let mut mints: HashMap<U256, (Address, u64)> = HashMap::new();
    let mut transferred: HashSet<U256> = HashSet::new();

    for tx in transfers {
        if tx.is_mint() {
            mints.insert(tx.token_id, (tx.to, tx.timestamp));
        } else {
            transferred.insert(tx.token_id);
        }
    }

    let mut paws = DiamondPaws::default();
    for (token_id, (wallet, minted_at)) in mints {
        if transferred.contains(&token_id) {
            continue;
        }
        paws.wallets.insert(wallet);
        paws.mint_times
            .entry(wallet)
            .and_modify(|ts| *ts = (*ts).max(minted_at))
            .or_insert(minted_at);
    }

    paws
}

/// Whole-token allocation per wallet.
///
/// Every share is a fraction over the common denominator
/// `mavericks * pandas * total_weight`, so a wallet's pool shares are summed
/// exactly and floored once.
pub fn compute_snapshot(
    mavericks: &DiamondPaws,
    pandas: &DiamondPaws,
    now: u64,
    params: &SnapshotParams,
) -> BTreeMap<Address, u128> {
    // Pandas mint time wins for wallets present in both collections
    let mut holdings: BTreeMap<Address, u128> = BTreeMap::new();
    for (wallet, minted_at) in mavericks.mint_times.iter().chain(pandas.mint_times.iter()) {
        let days_held = now.saturating_sub(*minted_at) / SECONDS_PER_DAY;
        holdings.insert(*wallet, days_held as u128 * params.reward_per_day);
    }
    let total_weight: u128 = holdings.values().sum();

    let mavericks_count = U256::from(mavericks.len().max(1));
    let pandas_count = U256::from(pandas.len().max(1));
    let weight_total = U256::from(total_weight.max(1));
    let denominator = mavericks_count * pandas_count * weight_total;

    let mut numerators: BTreeMap<Address, U256> = BTreeMap::new();

    for wallet in &mavericks.wallets {
        *numerators.entry(*wallet).or_default() +=
            U256::from(params.pool_mavericks) * pandas_count * weight_total;
    }
    for wallet in &pandas.wallets {
        *numerators.entry(*wallet).or_default() +=
            U256::from(params.pool_pandas) * mavericks_count * weight_total;
    }
    for (wallet, weight) in holdings {
        let share = if total_weight == 0 {
            U256::ZERO
        } else {
            U256::from(weight) * U256::from(params.pool_holding) * mavericks_count * pandas_count
        };
        *numerators.entry(wallet).or_default() += share;
    }

    numerators
        .into_iter()
        .map(|(wallet, numerator)| (wallet, (numerator / denominator).saturating_to::<u128>()))
        .collect()
}
