use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// A single wallet/amount pair to be registered as claimable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEntry {
    pub address: Address,
    pub amount: U256,
}

impl ClaimEntry {
    pub fn new(address: Address, amount: U256) -> Self {
        Self { address, amount }
    }
}

/// Split a batch into the parallel arrays `setClaimable` expects
pub fn split_batch(batch: &[ClaimEntry]) -> (Vec<Address>, Vec<U256>) {
    batch.iter().map(|e| (e.address, e.amount)).unzip()
}

/// Gas and nonce parameters of one batch transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
}

/// Inclusion data of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
}

/// One confirmed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub start_index: usize,
    pub size: usize,
    pub nonce: u64,
    pub gas_estimate: u64,
    pub gas_limit: u64,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Outcome of a complete submission run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub transaction_hashes: Vec<B256>,
    pub total_batches: usize,
    pub batches: Vec<BatchReceipt>,
    pub final_batch_size: usize,
}

impl SubmissionReport {
    pub fn entries_submitted(&self) -> usize {
        self.batches.iter().map(|b| b.size).sum()
    }

    pub fn total_gas_used(&self) -> u64 {
        self.batches.iter().map(|b| b.gas_used).sum()
    }
}
