//! One client session

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use replay_primitives::{parse_u256, parse_u64, Address, HexBytes, H256, U256};
use replay_vectors::AccountState;
use serde_json::Value;
use tracing::debug;

use crate::transport::{MockTransport, Transport};
use crate::types::{BlockId, RpcBlock};
use crate::RpcError;

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Default per-call timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for `debug_storageRangeAt` and `debug_accountRange`
const RANGE_PAGE: u64 = 256;

/// RPC channel bound to one client instance.
///
/// A session is owned by one worker and is not `Clone`; every call it makes is
/// bounded by the per-call timeout.
pub struct ClientSession {
    transport: Box<dyn Transport>,
    timeout: Duration,
}

impl ClientSession {
    /// Session over HTTP
    #[cfg(feature = "http")]
    pub fn connect(url: &str, timeout: Duration) -> Self {
        Self::with_transport(HttpTransport::new(url), timeout)
    }

    /// Session over a scripted mock transport (for testing)
    pub fn new_mock(mock: MockTransport) -> Self {
        Self::with_transport(mock, DEFAULT_CALL_TIMEOUT)
    }

    /// Session over a custom transport
    pub fn with_transport(transport: impl Transport + 'static, timeout: Duration) -> Self {
        Self {
            transport: Box::new(transport),
            timeout,
        }
    }

    /// Endpoint the session talks to
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let started = Instant::now();
        let reply = tokio::time::timeout(self.timeout, self.transport.request_json(method, params))
            .await
            .map_err(|_| RpcError::Timeout {
                method: method.to_string(),
                millis: self.timeout.as_millis(),
            })?;
        debug!(
            endpoint = self.endpoint(),
            method,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = reply.is_ok(),
            "rpc call"
        );
        reply
    }

    async fn call_str(&self, method: &str, params: Vec<Value>) -> Result<String, RpcError> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(RpcError::decode(method, format!("expected a string, got {}", other))),
        }
    }

    // ==================== Test control ====================

    /// Reset the client to a fresh chain described by `params`
    pub async fn set_chain_params(&self, params: &Value) -> Result<(), RpcError> {
        let reply = self.call("test_setChainParams", vec![params.clone()]).await?;
        match reply {
            Value::Bool(true) => Ok(()),
            other => Err(RpcError::decode(
                "test_setChainParams",
                format!("client did not accept chain params: {}", other),
            )),
        }
    }

    /// Import an encoded block; the client's rejection text comes back as
    /// [`RpcError::Rpc`]
    pub async fn import_raw_block(&self, rlp: &HexBytes) -> Result<H256, RpcError> {
        let method = "test_importRawBlock";
        let hash = self.call_str(method, vec![Value::String(rlp.to_hex())]).await?;
        H256::from_hex(&hash).map_err(|e| RpcError::decode(method, e))
    }

    // ==================== Chain queries ====================

    /// Current head number
    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let method = "eth_blockNumber";
        let n = self.call_str(method, vec![]).await?;
        parse_u64(&n).map_err(|e| RpcError::decode(method, e))
    }

    /// Block by hash
    pub async fn get_block_by_hash(&self, hash: &H256, full_transactions: bool) -> Result<RpcBlock, RpcError> {
        let method = "eth_getBlockByHash";
        let reply = self
            .call(method, vec![Value::String(hash.to_hex()), Value::Bool(full_transactions)])
            .await?;
        RpcBlock::from_json(method, reply)
    }

    /// Block by number or tag
    pub async fn get_block_by_number(&self, block: BlockId, full_transactions: bool) -> Result<RpcBlock, RpcError> {
        let method = "eth_getBlockByNumber";
        let reply = self
            .call(method, vec![serde_json::to_value(block)?, Value::Bool(full_transactions)])
            .await?;
        RpcBlock::from_json(method, reply)
    }

    /// Encoded block
    pub async fn get_raw_block(&self, block: BlockId) -> Result<HexBytes, RpcError> {
        let method = "debug_getRawBlock";
        let raw = self.call_str(method, vec![serde_json::to_value(block)?]).await?;
        HexBytes::from_hex(&raw).map_err(|e| RpcError::decode(method, e))
    }

    // ==================== State queries ====================

    /// Balance, nonce, code and full storage of an account
    pub async fn get_account_state(&self, address: &Address, block: BlockId) -> Result<AccountState, RpcError> {
        let at = serde_json::to_value(block)?;
        let who = Value::String(address.to_hex());

        let balance = self.call_str("eth_getBalance", vec![who.clone(), at.clone()]).await?;
        let balance = parse_u256(&balance).map_err(|e| RpcError::decode("eth_getBalance", e))?;

        let nonce = self
            .call_str("eth_getTransactionCount", vec![who.clone(), at.clone()])
            .await?;
        let nonce = parse_u256(&nonce).map_err(|e| RpcError::decode("eth_getTransactionCount", e))?;

        let code = self.call_str("eth_getCode", vec![who, at]).await?;
        let code = HexBytes::from_hex(&code).map_err(|e| RpcError::decode("eth_getCode", e))?;

        let storage = self.storage_range(address, block).await?;

        Ok(AccountState {
            balance,
            nonce,
            code,
            storage,
        })
    }

    async fn storage_range(&self, address: &Address, block: BlockId) -> Result<BTreeMap<U256, U256>, RpcError> {
        let method = "debug_storageRangeAt";
        let mut storage = BTreeMap::new();
        let mut start = "0x00".to_string();

        loop {
            let reply = self
                .call(
                    method,
                    vec![
                        serde_json::to_value(block)?,
                        Value::from(0u64),
                        Value::String(address.to_hex()),
                        Value::String(start.clone()),
                        Value::from(RANGE_PAGE),
                    ],
                )
                .await?;

            let slots = reply
                .get("storage")
                .and_then(Value::as_object)
                .ok_or_else(|| RpcError::decode(method, "reply has no 'storage' object"))?;
            for (hashed, slot) in slots {
                let key = slot
                    .get("key")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::decode(method, format!("slot {} has no key preimage", hashed)))?;
                let value = slot
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::decode(method, format!("slot {} has no value", hashed)))?;
                let key = parse_u256(key).map_err(|e| RpcError::decode(method, e))?;
                let value = parse_u256(value).map_err(|e| RpcError::decode(method, e))?;
                storage.insert(key, value);
            }

            match next_key(&reply, &start) {
                Some(next) => start = next,
                None => break,
            }
        }
        Ok(storage)
    }

    /// Every account the client holds at `block`
    pub async fn account_range(&self, block: BlockId) -> Result<Vec<Address>, RpcError> {
        let method = "debug_accountRange";
        let mut accounts = Vec::new();
        let mut start = "0x00".to_string();

        loop {
            let reply = self
                .call(
                    method,
                    vec![
                        serde_json::to_value(block)?,
                        Value::from(0u64),
                        Value::String(start.clone()),
                        Value::from(RANGE_PAGE),
                    ],
                )
                .await?;

            let map = reply
                .get("addressMap")
                .and_then(Value::as_object)
                .ok_or_else(|| RpcError::decode(method, "reply has no 'addressMap' object"))?;
            for address in map.values() {
                let address = address
                    .as_str()
                    .ok_or_else(|| RpcError::decode(method, "address is not a string"))?;
                accounts.push(Address::from_hex(address).map_err(|e| RpcError::decode(method, e))?);
            }

            match next_key(&reply, &start) {
                Some(next) => start = next,
                None => break,
            }
        }
        Ok(accounts)
    }
}

/// Continuation key of a paged range reply; `None` once the range is done
fn next_key(reply: &Value, current: &str) -> Option<String> {
    let next = reply.get("nextKey")?.as_str()?;
    let done = next == current || H256::from_hex(next).map(|h| h.is_zero()).unwrap_or(false);
    (!done).then(|| next.to_string())
}
