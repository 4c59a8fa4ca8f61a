//! Faucet and token contract bindings

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::utils::format_units;
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use alloy::transports::{RpcError, TransportError};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DistributorError, Result};
use crate::submitter::{ClaimChain, EstimationFailure};
use crate::types::{split_batch, ClaimEntry, Confirmation, TxParams};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IMavFaucet {
        function setClaimable(address[] calldata wallets, uint256[] calldata amounts) external;
        function claimable(address wallet) external view returns (uint256);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IERC721 {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function totalSupply() external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
    }
}

/// Encode `setClaimable` calldata for a batch
pub fn encode_set_claimable(batch: &[ClaimEntry]) -> Vec<u8> {
    let (wallets, amounts) = split_batch(batch);
    IMavFaucet::setClaimableCall { wallets, amounts }.abi_encode()
}

/// A JSON-RPC error response means the node evaluated the call and refused
/// it; anything else never got an answer from the node.
pub fn classify_estimation_error(err: TransportError) -> EstimationFailure {
    match err {
        RpcError::ErrorResp(payload) => EstimationFailure::Rejected(payload.to_string()),
        other => EstimationFailure::Transport(other.to_string()),
    }
}

/// `ClaimChain` backed by a signing provider and the deployed faucet
pub struct FaucetChain {
    provider: DynProvider,
    faucet: Address,
    sender: Address,
    chain_id: u64,
    poll_interval: Duration,
}

impl FaucetChain {
    pub fn new(
        provider: DynProvider,
        faucet: Address,
        sender: Address,
        chain_id: u64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            faucet,
            sender,
            chain_id,
            poll_interval,
        }
    }

    fn set_claimable_request(&self, batch: &[ClaimEntry]) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.sender)
            .with_to(self.faucet)
            .with_input(encode_set_claimable(batch))
    }
}

#[async_trait]
impl ClaimChain for FaucetChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn transaction_count(&self) -> Result<u64> {
        self.provider
            .get_transaction_count(self.sender)
            .await
            .map_err(|e| DistributorError::Provider(format!("Failed to get transaction count: {}", e)))
    }

    async fn estimate_set_claimable(
        &self,
        batch: &[ClaimEntry],
    ) -> std::result::Result<u64, EstimationFailure> {
        self.provider
            .estimate_gas(self.set_claimable_request(batch))
            .await
            .map_err(classify_estimation_error)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| DistributorError::Provider(format!("Failed to get gas price: {}", e)))
    }

    async fn send_set_claimable(&self, batch: &[ClaimEntry], params: TxParams) -> Result<B256> {
        let tx = self
            .set_claimable_request(batch)
            .with_chain_id(self.chain_id)
            .with_nonce(params.nonce)
            .with_gas_limit(params.gas_limit)
            .with_gas_price(params.gas_price);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| DistributorError::Provider(format!("Failed to send transaction: {}", e)))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, tx_hash: B256) -> Result<Confirmation> {
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            interval.tick().await;

            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(Confirmation {
                        tx_hash,
                        block_number: receipt.block_number(),
                        gas_used: receipt.gas_used(),
                        success: receipt.status(),
                    });
                }
                Ok(None) => debug!("Transaction {} still pending", tx_hash),
                // Polling is read-only, a lost response is retried on the next tick
                Err(e) => warn!("Receipt poll for {} failed: {}", tx_hash, e),
            }
        }
    }
}

/// Faucet balance snapshot used by the `check` command
#[derive(Debug, Clone)]
pub struct FaucetStatus {
    pub claimable: Option<U256>,
    pub token_balance: Option<U256>,
    pub decimals: Option<u8>,
}

impl FaucetStatus {
    pub fn formatted_balance(&self) -> Option<String> {
        match (self.token_balance, self.decimals) {
            (Some(balance), Some(decimals)) => format_units(balance, decimals).ok(),
            _ => None,
        }
    }
}

/// Read-only view on the faucet and its token
pub struct FaucetReader {
    provider: DynProvider,
    faucet: Address,
    token: Option<Address>,
}

impl FaucetReader {
    pub fn new(provider: DynProvider, faucet: Address, token: Option<Address>) -> Self {
        Self {
            provider,
            faucet,
            token,
        }
    }

    pub async fn claimable(&self, wallet: Address) -> Result<U256> {
        IMavFaucet::new(self.faucet, self.provider.clone())
            .claimable(wallet)
            .call()
            .await
            .map_err(|e| DistributorError::ContractCall(format!("claimable({}) failed: {}", wallet, e)))
    }

    /// Token balance held by the faucet and the token decimals
    pub async fn token_balance(&self) -> Result<Option<(U256, u8)>> {
        let Some(token) = self.token else {
            return Ok(None);
        };

        let erc20 = IERC20::new(token, self.provider.clone());
        let balance = erc20
            .balanceOf(self.faucet)
            .call()
            .await
            .map_err(|e| DistributorError::ContractCall(format!("balanceOf failed: {}", e)))?;
        let decimals = erc20
            .decimals()
            .call()
            .await
            .map_err(|e| DistributorError::ContractCall(format!("decimals failed: {}", e)))?;

        Ok(Some((balance, decimals)))
    }

    /// Amount by which the faucet balance falls short of `required`.
    ///
    /// Advisory: a failed lookup is logged and yields `None`, the contract
    /// decides whether a claim succeeds.
    pub async fn balance_shortfall(&self, required: U256) -> Option<U256> {
        match self.token_balance().await {
            Ok(Some((balance, _))) if balance < required => Some(required - balance),
            Ok(_) => None,
            Err(e) => {
                warn!("Faucet balance check skipped: {}", e);
                None
            }
        }
    }

    pub async fn status(&self, wallet: Option<Address>) -> Result<FaucetStatus> {
        let claimable = match wallet {
            Some(wallet) => Some(self.claimable(wallet).await?),
            None => None,
        };
        let token = self.token_balance().await?;

        Ok(FaucetStatus {
            claimable,
            token_balance: token.map(|(balance, _)| balance),
            decimals: token.map(|(_, decimals)| decimals),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::transports::TransportErrorKind;

    #[test]
    fn test_set_claimable_calldata() {
        let a: Address = "0x8D7ef68d3d17fE776254F4d023B905369c897230".parse().unwrap();
        let batch = vec![
            ClaimEntry::new(a, U256::from(10)),
            ClaimEntry::new(Address::ZERO, U256::from(20)),
        ];

        let data = encode_set_claimable(&batch);
        assert_eq!(&data[..4], IMavFaucet::setClaimableCall::SELECTOR.as_slice());

        let decoded = IMavFaucet::setClaimableCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.wallets, vec![a, Address::ZERO]);
        assert_eq!(decoded.amounts, vec![U256::from(10), U256::from(20)]);
    }

    #[test]
    fn test_error_response_is_rejection() {
        let payload = ErrorPayload {
            code: 3,
            message: "execution reverted".into(),
            data: None,
        };
        let failure = classify_estimation_error(RpcError::ErrorResp(payload));
        assert!(matches!(failure, EstimationFailure::Rejected(msg) if msg.contains("execution reverted")));
    }

    #[test]
    fn test_transport_failure_is_not_rejection() {
        let err = TransportErrorKind::custom_str("connection refused");
        let failure = classify_estimation_error(err);
        assert!(matches!(failure, EstimationFailure::Transport(_)));
    }

    #[test]
    fn test_formatted_balance() {
        let status = FaucetStatus {
            claimable: None,
            token_balance: Some(U256::from(1_500_000_000_000_000_000u128)),
            decimals: Some(18),
        };
        assert_eq!(status.formatted_balance().as_deref(), Some("1.500000000000000000"));
    }
}
