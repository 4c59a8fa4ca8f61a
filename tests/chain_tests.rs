//! Chain adapters against canned JSON-RPC responses

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{hex, TxKind};
use alloy::sol_types::{SolCall, SolEvent};
use mav_distributor::contract::{IMavFaucet, IERC20, IERC721};
use mav_distributor::events::fetch_transfers;
use mav_distributor::owners::collect_owners;
use mav_distributor::prelude::*;
use mav_distributor::{FaucetChain, FaucetReader, ProviderConfig, ProviderManager};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

fn faucet() -> Address {
    Address::repeat_byte(0xfa)
}

fn manager(server: &ServerGuard) -> ProviderManager {
    ProviderManager::new(ProviderConfig {
        rpc_url: server.url(),
        chain_id: 8453,
        timeout_seconds: 5,
    })
    .unwrap()
}

/// Answer every call of `method` with `respond(params)`, echoing the request id
async fn rpc_mock<F>(server: &mut ServerGuard, method: &str, respond: F) -> Mock
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": method })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |request| {
            let body: Value = serde_json::from_slice(request.body().unwrap()).unwrap();
            let mut reply = respond(&body["params"]);
            reply["jsonrpc"] = json!("2.0");
            reply["id"] = body["id"].clone();
            serde_json::to_vec(&reply).unwrap()
        })
        .create_async()
        .await
}

fn result(value: Value) -> Value {
    json!({ "result": value })
}

fn revert(message: &str) -> Value {
    json!({ "error": { "code": 3, "message": message } })
}

fn word(value: U256) -> Value {
    json!(hex::encode_prefixed(value.to_be_bytes::<32>()))
}

fn call_data(params: &Value) -> Vec<u8> {
    let input = params[0]["input"]
        .as_str()
        .or_else(|| params[0]["data"].as_str())
        .unwrap();
    hex::decode(input).unwrap()
}

fn entries() -> Vec<ClaimEntry> {
    vec![
        ClaimEntry::new(Address::repeat_byte(1), U256::from(10)),
        ClaimEntry::new(Address::repeat_byte(2), U256::from(20)),
    ]
}

fn receipt(tx_hash: B256, success: bool) -> Value {
    json!({
        "type": "0x0",
        "status": if success { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0xa410",
        "logs": [],
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0xbb),
        "blockNumber": "0x10",
        "gasUsed": "0xa410",
        "effectiveGasPrice": "0x3b9aca00",
        "from": DEV_ADDRESS,
        "to": faucet(),
        "contractAddress": null
    })
}

#[tokio::test]
async fn test_estimate_success_and_request_shape() {
    let mut server = mockito::Server::new_async().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    rpc_mock(&mut server, "eth_estimateGas", move |params| {
        recorded.lock().unwrap().push(params.clone());
        result(json!("0x1d4c0"))
    })
    .await;

    let sender: Address = DEV_ADDRESS.parse().unwrap();
    let chain = FaucetChain::new(manager(&server).provider(), faucet(), sender, 8453, Duration::from_millis(5));

    let gas = chain.estimate_set_claimable(&entries()).await.unwrap();
    assert_eq!(gas, 120_000);

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params[0]["to"].as_str().unwrap().parse::<Address>().unwrap(), faucet());
    assert_eq!(params[0]["from"].as_str().unwrap().parse::<Address>().unwrap(), sender);

    let decoded = IMavFaucet::setClaimableCall::abi_decode(&call_data(&params)).unwrap();
    assert_eq!(decoded.wallets, vec![Address::repeat_byte(1), Address::repeat_byte(2)]);
    assert_eq!(decoded.amounts, vec![U256::from(10), U256::from(20)]);
}

#[tokio::test]
async fn test_estimate_error_response_is_rejection() {
    let mut server = mockito::Server::new_async().await;
    rpc_mock(&mut server, "eth_estimateGas", |_| revert("execution reverted")).await;

    let chain = FaucetChain::new(
        manager(&server).provider(),
        faucet(),
        Address::repeat_byte(0xde),
        8453,
        Duration::from_millis(5),
    );

    let failure = chain.estimate_set_claimable(&entries()).await.unwrap_err();
    assert!(matches!(failure, EstimationFailure::Rejected(msg) if msg.contains("execution reverted")));
}

#[tokio::test]
async fn test_estimate_http_failure_is_transport() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let chain = FaucetChain::new(
        manager(&server).provider(),
        faucet(),
        Address::repeat_byte(0xde),
        8453,
        Duration::from_millis(5),
    );

    let failure = chain.estimate_set_claimable(&entries()).await.unwrap_err();
    assert!(matches!(failure, EstimationFailure::Transport(_)));
}

#[tokio::test]
async fn test_send_signs_legacy_transaction_with_given_params() {
    let mut server = mockito::Server::new_async().await;
    let raw_txs = Arc::new(Mutex::new(Vec::new()));
    let recorded = raw_txs.clone();
    let node_hash = B256::repeat_byte(0x42);
    rpc_mock(&mut server, "eth_sendRawTransaction", move |params| {
        recorded.lock().unwrap().push(params[0].as_str().unwrap().to_string());
        result(json!(node_hash))
    })
    .await;

    let signer = manager(&server).with_signer(DEV_KEY).unwrap();
    let sender = signer.signer_address().unwrap();
    let chain = FaucetChain::new(signer.provider(), faucet(), sender, 8453, Duration::from_millis(5));

    let params = TxParams {
        nonce: 17,
        gas_limit: 130_000,
        gas_price: 1_000_000_000,
    };
    let tx_hash = chain.send_set_claimable(&entries(), params).await.unwrap();
    assert_eq!(tx_hash, node_hash);

    let raw = hex::decode(&raw_txs.lock().unwrap()[0]).unwrap();
    let envelope = TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap();
    let legacy = envelope.as_legacy().expect("legacy transaction").tx();

    assert_eq!(legacy.nonce, 17);
    assert_eq!(legacy.gas_limit, 130_000);
    assert_eq!(legacy.gas_price, 1_000_000_000);
    assert_eq!(legacy.chain_id, Some(8453));
    assert_eq!(legacy.to, TxKind::Call(faucet()));
    assert_eq!(&legacy.input[..4], IMavFaucet::setClaimableCall::SELECTOR.as_slice());
}

#[tokio::test]
async fn test_confirmation_polls_until_receipt() {
    let mut server = mockito::Server::new_async().await;
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let tx_hash = B256::repeat_byte(0x42);
    rpc_mock(&mut server, "eth_getTransactionReceipt", move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            result(Value::Null)
        } else {
            result(receipt(tx_hash, true))
        }
    })
    .await;

    let chain = FaucetChain::new(
        manager(&server).provider(),
        faucet(),
        DEV_ADDRESS.parse().unwrap(),
        8453,
        Duration::from_millis(5),
    );

    let confirmation = tokio::time::timeout(Duration::from_secs(5), chain.wait_for_confirmation(tx_hash))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(confirmation.tx_hash, tx_hash);
    assert_eq!(confirmation.block_number, Some(16));
    assert_eq!(confirmation.gas_used, 42_000);
    assert!(confirmation.success);
}

#[tokio::test]
async fn test_confirmation_reports_failed_status() {
    let mut server = mockito::Server::new_async().await;
    let tx_hash = B256::repeat_byte(0x43);
    rpc_mock(&mut server, "eth_getTransactionReceipt", move |_| result(receipt(tx_hash, false))).await;

    let chain = FaucetChain::new(
        manager(&server).provider(),
        faucet(),
        DEV_ADDRESS.parse().unwrap(),
        8453,
        Duration::from_millis(5),
    );

    let confirmation = tokio::time::timeout(Duration::from_secs(5), chain.wait_for_confirmation(tx_hash))
        .await
        .unwrap()
        .unwrap();
    assert!(!confirmation.success);
}

fn transfer_log(
    contract: Address,
    from: Address,
    to: Address,
    token_id: u64,
    block: Option<u64>,
    log_index: u64,
) -> Value {
    json!({
        "address": contract,
        "topics": [
            IERC721::Transfer::SIGNATURE_HASH,
            from.into_word(),
            to.into_word(),
            B256::from(U256::from(token_id).to_be_bytes::<32>()),
        ],
        "data": "0x",
        "blockNumber": block.map(|b| format!("{:#x}", b)),
        "blockHash": block.map(|_| B256::repeat_byte(0xbb)),
        "transactionHash": B256::repeat_byte(0xaa),
        "transactionIndex": "0x0",
        "logIndex": block.map(|_| format!("{:#x}", log_index)),
        "removed": false
    })
}

#[tokio::test]
async fn test_fetch_transfers_chunks_decodes_and_sorts() {
    let mut server = mockito::Server::new_async().await;
    let contract = Address::repeat_byte(0xcc);
    let (alice, bob) = (Address::repeat_byte(0xa1), Address::repeat_byte(0xb0));
    let ranges = Arc::new(Mutex::new(Vec::new()));
    let recorded = ranges.clone();

    rpc_mock(&mut server, "eth_getLogs", move |params| {
        let filter = &params[0];
        let from = filter["fromBlock"].as_str().unwrap().to_string();
        let to = filter["toBlock"].as_str().unwrap().to_string();
        recorded.lock().unwrap().push((from.clone(), to));

        let logs = if from == "0x0" {
            // Out of order, plus a pending log and a fungible-style Transfer
            let mut fungible = transfer_log(contract, alice, bob, 0, Some(2), 0);
            fungible["topics"].as_array_mut().unwrap().pop();
            fungible["data"] = word(U256::from(5));
            json!([
                transfer_log(contract, alice, bob, 1, Some(3), 1),
                transfer_log(contract, Address::ZERO, alice, 1, Some(3), 0),
                transfer_log(contract, Address::ZERO, bob, 9, None, 0),
                fungible,
            ])
        } else {
            json!([transfer_log(contract, Address::ZERO, bob, 2, Some(7), 4)])
        };
        result(logs)
    })
    .await;

    let records = fetch_transfers(&manager(&server).provider(), contract, 0, 9, 5)
        .await
        .unwrap();

    assert_eq!(
        *ranges.lock().unwrap(),
        vec![("0x0".to_string(), "0x4".to_string()), ("0x5".to_string(), "0x9".to_string())]
    );

    assert_eq!(records.len(), 3);
    assert!(records[0].is_mint());
    assert_eq!((records[0].block_number, records[0].log_index), (3, 0));
    assert_eq!(records[0].to, alice);
    assert_eq!((records[1].block_number, records[1].log_index), (3, 1));
    assert_eq!(records[1].from, alice);
    assert_eq!(records[1].to, bob);
    assert_eq!(records[2].token_id, U256::from(2));
    assert_eq!(records[2].block_number, 7);
}

#[tokio::test]
async fn test_collect_owners_skips_missing_tokens() {
    let mut server = mockito::Server::new_async().await;
    let (alice, bob) = (Address::repeat_byte(0xa1), Address::repeat_byte(0xb0));

    rpc_mock(&mut server, "eth_call", move |params| {
        let data = call_data(params);
        if data[..4] == IERC721::totalSupplyCall::SELECTOR[..] {
            return result(word(U256::from(4)));
        }
        let call = IERC721::ownerOfCall::abi_decode(&data).unwrap();
        match call.tokenId.to::<u64>() {
            0 | 3 => result(json!(hex::encode_prefixed(alice.into_word()))),
            1 => result(json!(hex::encode_prefixed(bob.into_word()))),
            _ => revert("execution reverted: ERC721: invalid token ID"),
        }
    })
    .await;

    let snapshot = collect_owners(&manager(&server).provider(), Address::repeat_byte(0xcc))
        .await
        .unwrap();

    assert_eq!(snapshot.owners.len(), 2);
    assert!(snapshot.owners.contains(&alice));
    assert!(snapshot.owners.contains(&bob));
    assert_eq!(snapshot.missing_tokens, vec![U256::from(2)]);
}

#[tokio::test]
async fn test_collect_owners_requires_total_supply() {
    let mut server = mockito::Server::new_async().await;
    rpc_mock(&mut server, "eth_call", |_| revert("execution reverted")).await;

    let err = collect_owners(&manager(&server).provider(), Address::repeat_byte(0xcc))
        .await
        .unwrap_err();

    assert!(matches!(err, DistributorError::ContractCall(msg) if msg.contains("totalSupply")));
}

async fn token_mock(server: &mut ServerGuard, balance: u64, decimals_available: bool) {
    rpc_mock(server, "eth_call", move |params| {
        let data = call_data(params);
        if data[..4] == IERC20::balanceOfCall::SELECTOR[..] {
            result(word(U256::from(balance)))
        } else if decimals_available {
            result(word(U256::from(18)))
        } else {
            revert("execution reverted")
        }
    })
    .await;
}

#[tokio::test]
async fn test_balance_shortfall_reported() {
    let mut server = mockito::Server::new_async().await;
    token_mock(&mut server, 100, true).await;

    let reader = FaucetReader::new(manager(&server).provider(), faucet(), Some(Address::repeat_byte(0x70)));

    assert_eq!(reader.balance_shortfall(U256::from(1_000)).await, Some(U256::from(900)));
    assert_eq!(reader.balance_shortfall(U256::from(100)).await, None);
}

#[tokio::test]
async fn test_balance_lookup_failure_is_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    token_mock(&mut server, 100, false).await;

    let reader = FaucetReader::new(manager(&server).provider(), faucet(), Some(Address::repeat_byte(0x70)));

    assert!(reader.token_balance().await.is_err());
    assert_eq!(reader.balance_shortfall(U256::from(1_000)).await, None);
}

#[tokio::test]
async fn test_balance_shortfall_without_token_address() {
    let server = mockito::Server::new_async().await;
    let reader = FaucetReader::new(manager(&server).provider(), faucet(), None);
    assert_eq!(reader.balance_shortfall(U256::from(1)).await, None);
}
