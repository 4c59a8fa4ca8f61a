//! Batched `setClaimable` submission with adaptive batch sizing
//!
//! Entries are sent in contiguous batches. When the node rejects the gas
//! estimation of a batch, the batch-size limit is halved and the same cursor
//! is retried; the reduced limit applies to the rest of the run. Each batch
//! is confirmed before the next is estimated, so the nonce is tracked locally
//! without any pending-transaction bookkeeping.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::DistributionConfig;
use crate::error::{DistributorError, Result};
use crate::types::{BatchReceipt, ClaimEntry, Confirmation, SubmissionReport, TxParams};

/// Why a gas estimation did not produce a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimationFailure {
    /// The node answered with an error (revert, out of gas, bad arguments)
    Rejected(String),
    /// No usable answer reached us (connection, timeout, malformed response)
    Transport(String),
}

/// Chain operations the submitter needs
#[async_trait]
pub trait ClaimChain: Send + Sync {
    /// Address the transactions are sent from
    fn sender(&self) -> Address;

    /// Current transaction count of the sender
    async fn transaction_count(&self) -> Result<u64>;

    /// Estimate gas of `setClaimable` for the batch
    async fn estimate_set_claimable(
        &self,
        batch: &[ClaimEntry],
    ) -> std::result::Result<u64, EstimationFailure>;

    /// Current network gas price in wei
    async fn gas_price(&self) -> Result<u128>;

    /// Build, sign and broadcast `setClaimable` for the batch
    async fn send_set_claimable(&self, batch: &[ClaimEntry], params: TxParams) -> Result<B256>;

    /// Wait until the transaction is included in a block
    async fn wait_for_confirmation(&self, tx_hash: B256) -> Result<Confirmation>;
}

/// Loop state threaded through a submission run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionState {
    cursor: usize,
    nonce: u64,
    batch_size_limit: usize,
    initial_batch_size: usize,
}

impl SubmissionState {
    pub fn new(nonce: u64, initial_batch_size: usize) -> Result<Self> {
        if initial_batch_size == 0 {
            return Err(DistributorError::InvalidInput(
                "initial batch size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            cursor: 0,
            nonce,
            batch_size_limit: initial_batch_size,
            initial_batch_size,
        })
    }

    pub fn starting_at(mut self, cursor: usize) -> Self {
        self.cursor = cursor;
        self
    }

    /// Index of the first entry not yet confirmed
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Nonce of the next transaction
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Current upper bound on the batch length, never above the initial size
    pub fn batch_size_limit(&self) -> usize {
        self.batch_size_limit
    }

    pub fn initial_batch_size(&self) -> usize {
        self.initial_batch_size
    }

    pub fn is_complete(&self, total: usize) -> bool {
        self.cursor >= total
    }

    /// Length of the next candidate batch
    pub fn next_batch_len(&self, total: usize) -> usize {
        self.batch_size_limit.min(total.saturating_sub(self.cursor))
    }

    /// Halve the limit after a rejected estimation of `failed_len` entries.
    ///
    /// Returns `false` when the failed batch held a single entry and no
    /// smaller batch exists.
    pub fn shrink(&mut self, failed_len: usize) -> bool {
        if failed_len <= 1 {
            return false;
        }
        let halved = (failed_len / 2).max(1);
        self.batch_size_limit = self.batch_size_limit.min(halved);
        true
    }

    /// Record a confirmed batch
    pub fn advance(&mut self, batch_len: usize) {
        self.cursor += batch_len;
        self.nonce += 1;
    }
}

/// Tunables of the submission loop
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    pub gas_buffer: u64,
    pub confirmation_timeout: Duration,
    pub transport_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self::from(&DistributionConfig::default())
    }
}

impl From<&DistributionConfig> for SubmitterConfig {
    fn from(config: &DistributionConfig) -> Self {
        Self {
            gas_buffer: config.gas_buffer,
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
            transport_retries: config.transport_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

pub struct BatchSubmitter<C: ClaimChain> {
    chain: C,
    config: SubmitterConfig,
}

impl<C: ClaimChain> BatchSubmitter<C> {
    pub fn new(chain: C, config: SubmitterConfig) -> Self {
        Self { chain, config }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Register every entry as claimable
    pub async fn submit_all(
        &self,
        entries: &[ClaimEntry],
        initial_batch_size: usize,
    ) -> Result<SubmissionReport> {
        self.submit_from(entries, initial_batch_size, 0).await
    }

    /// Register the entries from index `start` onward
    pub async fn submit_from(
        &self,
        entries: &[ClaimEntry],
        initial_batch_size: usize,
        start: usize,
    ) -> Result<SubmissionReport> {
        let total = entries.len();
        if start > total {
            return Err(DistributorError::InvalidInput(format!(
                "start index {} is past the last entry ({} entries)",
                start, total
            )));
        }

        let mut report = SubmissionReport {
            final_batch_size: initial_batch_size,
            ..Default::default()
        };

        if start == total {
            info!("No entries to submit");
            return Ok(report);
        }

        let nonce = self.chain.transaction_count().await?;
        let mut state = SubmissionState::new(nonce, initial_batch_size)?.starting_at(start);

        info!(
            "Submitting {} entries from index {} as {:?}, starting nonce {}, batch size {}",
            total - start,
            start,
            self.chain.sender(),
            nonce,
            initial_batch_size
        );

        let mut transport_failures = 0u32;

        while !state.is_complete(total) {
            let batch_len = state.next_batch_len(total);
            let batch = &entries[state.cursor()..state.cursor() + batch_len];

            let gas_estimate = match self.chain.estimate_set_claimable(batch).await {
                Ok(gas) => {
                    transport_failures = 0;
                    gas
                }
                Err(EstimationFailure::Rejected(reason)) => {
                    warn!(
                        "Gas estimation failed for batch starting at index {}: {}",
                        state.cursor(), reason
                    );
                    if !state.shrink(batch_len) {
                        error!("Single wallet batch failed to estimate gas, cannot proceed");
                        return Err(DistributorError::UnprocessableEntry {
                            index: state.cursor(),
                            address: batch[0].address,
                            reason,
                        });
                    }
                    warn!("Reducing batch size to {} and retrying", state.batch_size_limit());
                    continue;
                }
                Err(EstimationFailure::Transport(reason)) => {
                    transport_failures += 1;
                    if transport_failures > self.config.transport_retries {
                        error!(
                            "Gas estimation unreachable after {} retries at index {}",
                            self.config.transport_retries, state.cursor()
                        );
                        return Err(DistributorError::Transport(format!(
                            "gas estimation at index {}: {}",
                            state.cursor(), reason
                        )));
                    }
                    warn!(
                        "Transport failure during gas estimation (attempt {}/{}): {}",
                        transport_failures, self.config.transport_retries, reason
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                    continue;
                }
            };

            let gas_limit = gas_estimate.saturating_add(self.config.gas_buffer);
            let gas_price = self.chain.gas_price().await?;
            let params = TxParams {
                nonce: state.nonce(),
                gas_limit,
                gas_price,
            };

            info!(
                "Batch {}: {} wallets, estimated gas {}, sending with gas limit {}",
                report.total_batches + 1,
                batch_len,
                gas_estimate,
                gas_limit
            );
            debug!("Batch params: {:?}", params);

            let cursor = state.cursor();
            let tx_hash = self
                .chain
                .send_set_claimable(batch, params)
                .await
                .map_err(|e| DistributorError::Transaction {
                    cursor,
                    reason: e.to_string(),
                })?;
            info!("Batch sent: {}", tx_hash);

            let confirmation = match tokio::time::timeout(
                self.config.confirmation_timeout,
                self.chain.wait_for_confirmation(tx_hash),
            )
            .await
            {
                Ok(Ok(confirmation)) => confirmation,
                Ok(Err(e)) => {
                    return Err(DistributorError::Transaction {
                        cursor,
                        reason: e.to_string(),
                    })
                }
                Err(_) => {
                    error!("Batch {} not mined within {:?}", tx_hash, self.config.confirmation_timeout);
                    return Err(DistributorError::ConfirmationTimeout { tx_hash, cursor });
                }
            };

            if !confirmation.success {
                error!("Batch {} reverted", tx_hash);
                return Err(DistributorError::TransactionReverted { tx_hash, cursor });
            }

            info!("Batch mined, gas used: {}", confirmation.gas_used);

            report.transaction_hashes.push(tx_hash);
            report.batches.push(BatchReceipt {
                start_index: cursor,
                size: batch_len,
                nonce: state.nonce(),
                gas_estimate,
                gas_limit,
                tx_hash,
                block_number: confirmation.block_number,
                gas_used: confirmation.gas_used,
            });
            report.total_batches += 1;

            state.advance(batch_len);
        }

        report.final_batch_size = state.batch_size_limit();
        Ok(report)
    }
}
