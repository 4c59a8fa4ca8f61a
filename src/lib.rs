//! MAV reward distribution toolkit
//!
//! Reward snapshots for the EVMavericks and Pandas collections and batched
//! registration of the resulting allocations on the Base faucet contract,
//! built on top of Alloy.
//!
//! # Features
//!
//! - Explorer snapshot: diamond-paw and holding-day pools from NFT transfer history
//! - On-chain tiers: tiered holding rewards from `Transfer` logs
//! - **Adaptive batch submission** of `setClaimable`, halving the batch on
//!   rejected gas estimation
//! - Collection holder listing via `totalSupply`/`ownerOf`
//! - Faucet balance and claimable checks
//!
//! # Example
//!
//! ```rust,no_run
//! use mav_distributor::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load_from_file("config.yaml").await?;
//!     let key = config::private_key_from_env()?;
//!
//!     let manager = ProviderManager::new(ProviderConfig::from(config.chain()?))?
//!         .with_signer(&key)?;
//!     let sender = manager.signer_address().expect("signer configured");
//!
//!     let chain = FaucetChain::new(
//!         manager.provider(),
//!         config.faucet()?.address,
//!         sender,
//!         manager.chain_id(),
//!         Duration::from_secs(2),
//!     );
//!
//!     let entries = CsvProcessor::read_claims(&config.distribution.csv_path)?;
//!     let submitter = BatchSubmitter::new(chain, SubmitterConfig::from(&config.distribution));
//!     let report = submitter
//!         .submit_all(&entries, config.distribution.initial_batch_size)
//!         .await?;
//!
//!     println!("{} batches", report.total_batches);
//!     Ok(())
//! }
//! ```

pub mod allocation;
pub mod config;
pub mod contract;
pub mod csv_processor;
pub mod error;
pub mod events;
pub mod explorer;
pub mod owners;
pub mod provider;
pub mod submitter;
pub mod tiers;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use contract::{FaucetChain, FaucetReader, FaucetStatus};
pub use csv_processor::CsvProcessor;
pub use error::{DistributorError, Result};
pub use explorer::{ExplorerClient, NftTransfer};
pub use provider::{ProviderConfig, ProviderManager};
pub use submitter::{BatchSubmitter, ClaimChain, EstimationFailure, SubmissionState, SubmitterConfig};
pub use types::{BatchReceipt, ClaimEntry, Confirmation, SubmissionReport, TxParams};

// Re-export Alloy types for convenience
pub use alloy_primitives::{Address, B256, U256};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::csv_processor::CsvProcessor;
    pub use crate::error::{DistributorError, Result};
    pub use crate::submitter::{
        BatchSubmitter, ClaimChain, EstimationFailure, SubmissionState, SubmitterConfig,
    };
    pub use crate::types::{ClaimEntry, Confirmation, SubmissionReport, TxParams};
    pub use alloy_primitives::{Address, B256, U256};
}
