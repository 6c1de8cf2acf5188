//! Session tests against the scripted mock transport

use std::time::Duration;

use replay_primitives::{Address, HexBytes, H256, U256};
use replay_rpc::{BlockId, ClientSession, MockTransport, RpcError};
use serde_json::{json, Value};

const ADDR: &str = "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b";

fn hash(byte: &str) -> String {
    format!("0x{}", byte.repeat(32))
}

#[tokio::test]
async fn test_import_returns_hash() {
    let mock = MockTransport::new();
    mock.push_response("test_importRawBlock", json!(hash("ab")));
    let session = ClientSession::new_mock(mock.clone());

    let imported = session
        .import_raw_block(&HexBytes::from_hex("0xf90201").unwrap())
        .await
        .unwrap();
    assert_eq!(imported, H256::from_hex(&hash("ab")).unwrap());

    let calls = mock.calls();
    assert_eq!(calls[0].0, "test_importRawBlock");
    assert_eq!(calls[0].1, vec![json!("0xf90201")]);
}

#[tokio::test]
async fn test_import_rejection_keeps_client_text() {
    let mock = MockTransport::new();
    mock.push_error("test_importRawBlock", -32000, "invalid block: gas limit exceeded");
    let session = ClientSession::new_mock(mock);

    let err = session
        .import_raw_block(&HexBytes::from_hex("0x00").unwrap())
        .await
        .unwrap_err();
    assert!(!err.is_infrastructure());
    assert_eq!(err.client_message(), Some("invalid block: gas limit exceeded"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_client_times_out() {
    let mock = MockTransport::new();
    mock.set_response("eth_blockNumber", json!("0x1"));
    mock.set_delay(Duration::from_secs(10));
    let session = ClientSession::with_transport(mock, Duration::from_secs(1));

    let err = session.block_number().await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout { ref method, millis: 1000 } if method == "eth_blockNumber"));
    assert!(err.is_infrastructure());
}

#[tokio::test]
async fn test_account_state_pages_storage() {
    let mock = MockTransport::new();
    mock.set_response("eth_getBalance", json!("0x0de0b6b3a7640000"));
    mock.set_response("eth_getTransactionCount", json!("0x1"));
    mock.set_response("eth_getCode", json!("0x6001600055"));
    mock.push_response(
        "debug_storageRangeAt",
        json!({
            "storage": { hash("01"): { "key": "0x00", "value": "0x01" } },
            "nextKey": hash("02")
        }),
    );
    mock.push_response(
        "debug_storageRangeAt",
        json!({
            "storage": { hash("02"): { "key": "0x01", "value": "0x02" } },
            "nextKey": null
        }),
    );
    let session = ClientSession::new_mock(mock.clone());

    let address = Address::from_hex(ADDR).unwrap();
    let account = session.get_account_state(&address, BlockId::Number(1)).await.unwrap();

    assert_eq!(account.balance, U256::from(1_000_000_000_000_000_000u64));
    assert_eq!(account.nonce, U256::one());
    assert_eq!(account.code.to_hex(), "0x6001600055");
    assert_eq!(account.storage.len(), 2);
    assert_eq!(account.slot(&U256::one()), U256::from(2u64));

    let pages: Vec<Vec<Value>> = mock
        .calls()
        .into_iter()
        .filter(|(m, _)| m == "debug_storageRangeAt")
        .map(|(_, p)| p)
        .collect();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0][0], json!("0x1"));
    assert_eq!(pages[0][3], json!("0x00"));
    assert_eq!(pages[1][3], json!(hash("02")));
}

#[tokio::test]
async fn test_account_range_collects_every_page() {
    let mock = MockTransport::new();
    mock.push_response(
        "debug_accountRange",
        json!({ "addressMap": { hash("01"): ADDR }, "nextKey": hash("05") }),
    );
    mock.push_response(
        "debug_accountRange",
        json!({
            "addressMap": { hash("05"): "0x2adc25665018aa1fe0e6bc666dac8fc2697ff9ba" },
            "nextKey": hash("00")
        }),
    );
    let session = ClientSession::new_mock(mock);

    let accounts = session.account_range(BlockId::Number(2)).await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0], Address::from_hex(ADDR).unwrap());
}

#[tokio::test]
async fn test_missing_block_is_decode_error() {
    let mock = MockTransport::new();
    mock.set_response("eth_getBlockByHash", Value::Null);
    let session = ClientSession::new_mock(mock);

    let err = session
        .get_block_by_hash(&H256::ZERO, true)
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Decode { .. }));
}

#[tokio::test]
async fn test_raw_block() {
    let mock = MockTransport::new();
    mock.set_handler("debug_getRawBlock", |params| {
        assert_eq!(params[0], json!("0x0"));
        Ok(json!("0xf901f9a0"))
    });
    let session = ClientSession::new_mock(mock);

    let raw = session.get_raw_block(BlockId::Number(0)).await.unwrap();
    assert_eq!(raw.to_hex(), "0xf901f9a0");
}
