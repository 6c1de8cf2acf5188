//! Shared fixtures: vector cases and a scripted client
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use replay_engine::ClientConfig;
use replay_rpc::{ClientSession, MockTransport, RpcError};
use replay_vectors::TestVectorFile;
use serde_json::{json, Map, Value};

pub const SENDER: &str = "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b";
pub const COINBASE: &str = "0x8888f1f195afa192cfee860698584c030f4c9db1";
pub const GENESIS_RLP: &str = "0xf901f9a0";

/// 32-byte hex value made of one repeated byte
pub fn h(byte: &str) -> String {
    format!("0x{}", byte.repeat(32))
}

pub fn genesis_hash() -> String {
    h("01")
}

pub fn config() -> ClientConfig {
    ClientConfig::from_toml_str(
        r#"
        name = "fake client"
        forks = ["Berlin", "London", "Paris", "Shanghai"]

        [mining_rewards]
        Berlin = "2000000000000000000"
        Paris = "0"

        [[exceptions]]
        id = "OutOfGas"
        pattern = "out of gas"

        [[exceptions]]
        id = "A"
        pattern = "foo"

        [[exceptions]]
        id = "B"
        pattern = "bar"

        [[exceptions]]
        id = "InvalidBlockNonce"
        pattern = "invalid nonce"
        "#,
    )
    .unwrap()
}

/// Builder for one vector case
pub struct CaseBuilder {
    value: Map<String, Value>,
}

impl CaseBuilder {
    /// Legacy (pre-1559) case on Berlin with no blocks
    pub fn legacy() -> Self {
        let value = json!({
            "_info": { "comment": "fixture" },
            "network": "Berlin",
            "sealEngine": "NoProof",
            "genesisBlockHeader": {
                "coinbase": COINBASE,
                "difficulty": "0x020000",
                "extraData": "0x00",
                "gasLimit": "0x7fffffffffffffff",
                "hash": genesis_hash(),
                "mixHash": h("00"),
                "nonce": "0x0000000000000000",
                "number": "0x00",
                "stateRoot": h("a0"),
                "timestamp": "0x54c98c81"
            },
            "genesisRLP": GENESIS_RLP,
            "pre": {
                SENDER: { "balance": "0x0de0b6b3a7640000", "code": "0x", "nonce": "0x00", "storage": {} }
            },
            "blocks": [],
            "postStateHash": h("a0"),
            "lastblockhash": genesis_hash()
        });
        Self {
            value: value.as_object().cloned().unwrap(),
        }
    }

    pub fn network(mut self, network: &str) -> Self {
        self.value.insert("network".into(), json!(network));
        self
    }

    /// Block checked against the client's copy
    pub fn verified_block(mut self, rlp: &str, hash: &str, number: u64, uncles: usize) -> Self {
        let block = json!({
            "rlp": rlp,
            "blockHeader": { "hash": hash, "number": format!("{:#x}", number), "stateRoot": h("a1") },
            "transactions": [],
            "uncleHeaders": vec![json!({}); uncles]
        });
        self.push_block(block)
    }

    /// Block with import outcome only
    pub fn blind_block(self, rlp: &str) -> Self {
        self.push_block(json!({ "rlp": rlp }))
    }

    /// Block the client must reject
    pub fn rejected_block(self, rlp: &str, exception: &str) -> Self {
        self.push_block(json!({ "rlp": rlp, "expectException": exception }))
    }

    /// Give the last block `count` expected transactions
    pub fn transactions(mut self, count: usize) -> Self {
        if let Some(block) = self
            .value
            .get_mut("blocks")
            .and_then(Value::as_array_mut)
            .and_then(|blocks| blocks.last_mut())
        {
            block["transactions"] = json!(vec![json!({ "nonce": "0x00" }); count]);
        }
        self
    }

    fn push_block(mut self, block: Value) -> Self {
        if let Some(Value::Array(blocks)) = self.value.get_mut("blocks") {
            blocks.push(block);
        }
        self
    }

    pub fn exceptions(mut self, ids: &[&str]) -> Self {
        self.value.insert("exceptions".into(), json!(ids));
        self
    }

    pub fn post_state_hash(mut self, root: &str) -> Self {
        self.value.remove("postState");
        self.value.insert("postStateHash".into(), json!(root));
        self
    }

    pub fn post_state(mut self, state: Value) -> Self {
        self.value.remove("postStateHash");
        self.value.insert("postState".into(), state);
        self
    }

    pub fn last_block_hash(mut self, hash: &str) -> Self {
        self.value.insert("lastblockhash".into(), json!(hash));
        self
    }

    pub fn without(mut self, field: &str) -> Self {
        self.value.remove(field);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.value)
    }
}

/// Vector file from named cases, in the given order
pub fn vector_file(cases: Vec<(&str, Value)>) -> TestVectorFile {
    let map: Map<String, Value> = cases.into_iter().map(|(n, v)| (n.to_string(), v)).collect();
    TestVectorFile::from_json_str(&Value::Object(map).to_string()).unwrap()
}

#[derive(Default)]
struct ClientState {
    imports: HashMap<String, Result<String, String>>,
    blocks: HashMap<String, Value>,
    head: Option<Value>,
    genesis_rlp: String,
    accounts: HashMap<String, Value>,
}

/// Client whose replies depend only on the request, so any number of
/// sessions can share it
#[derive(Clone)]
pub struct FakeClient {
    pub mock: MockTransport,
    state: Arc<Mutex<ClientState>>,
}

impl FakeClient {
    pub fn new() -> Self {
        let mock = MockTransport::new();
        let state = Arc::new(Mutex::new(ClientState {
            genesis_rlp: GENESIS_RLP.to_string(),
            ..ClientState::default()
        }));

        let s = Arc::clone(&state);
        mock.set_handler("test_importRawBlock", move |params| {
            let rlp = params[0].as_str().unwrap_or_default().to_string();
            match s.lock().unwrap().imports.get(&rlp) {
                Some(Ok(hash)) => Ok(json!(hash)),
                Some(Err(message)) => Err(RpcError::Rpc {
                    code: -32000,
                    message: message.clone(),
                }),
                None => Err(RpcError::Rpc {
                    code: -32000,
                    message: format!("unknown block {}", rlp),
                }),
            }
        });

        let s = Arc::clone(&state);
        mock.set_handler("eth_getBlockByHash", move |params| {
            let hash = params[0].as_str().unwrap_or_default();
            Ok(s.lock().unwrap().blocks.get(hash).cloned().unwrap_or(Value::Null))
        });

        let s = Arc::clone(&state);
        mock.set_handler("eth_blockNumber", move |_| {
            let state = s.lock().unwrap();
            Ok(state.head.as_ref().map_or(json!("0x0"), |b| b["number"].clone()))
        });

        let s = Arc::clone(&state);
        mock.set_handler("eth_getBlockByNumber", move |_| {
            Ok(s.lock().unwrap().head.clone().unwrap_or(Value::Null))
        });

        let s = Arc::clone(&state);
        mock.set_handler("debug_getRawBlock", move |_| Ok(json!(s.lock().unwrap().genesis_rlp)));

        for (method, field) in [
            ("eth_getBalance", "balance"),
            ("eth_getTransactionCount", "nonce"),
            ("eth_getCode", "code"),
        ] {
            let s = Arc::clone(&state);
            mock.set_handler(method, move |params| {
                let address = params[0].as_str().unwrap_or_default();
                let state = s.lock().unwrap();
                let fallback = if field == "code" { json!("0x") } else { json!("0x0") };
                Ok(state
                    .accounts
                    .get(address)
                    .map_or(fallback.clone(), |a| a.get(field).cloned().unwrap_or(fallback)))
            });
        }

        let s = Arc::clone(&state);
        mock.set_handler("debug_storageRangeAt", move |params| {
            let address = params[2].as_str().unwrap_or_default();
            let state = s.lock().unwrap();
            let mut storage = Map::new();
            if let Some(Value::Object(slots)) = state.accounts.get(address).and_then(|a| a.get("storage")) {
                for (i, (key, value)) in slots.iter().enumerate() {
                    storage.insert(format!("0x{:064x}", i + 1), json!({ "key": key, "value": value }));
                }
            }
            Ok(json!({ "storage": storage, "nextKey": null }))
        });

        let s = Arc::clone(&state);
        mock.set_handler("debug_accountRange", move |_| {
            let state = s.lock().unwrap();
            let map: Map<String, Value> = state
                .accounts
                .keys()
                .enumerate()
                .map(|(i, a)| (format!("0x{:064x}", i + 1), json!(a)))
                .collect();
            Ok(json!({ "addressMap": map, "nextKey": null }))
        });

        Self { mock, state }
    }

    pub fn session(&self) -> ClientSession {
        ClientSession::new_mock(self.mock.clone())
    }

    /// Accept `rlp` as block `hash`
    pub fn accept(&self, rlp: &str, hash: &str) -> &Self {
        self.state.lock().unwrap().imports.insert(rlp.to_string(), Ok(hash.to_string()));
        self
    }

    /// Reject `rlp` with `message`
    pub fn reject(&self, rlp: &str, message: &str) -> &Self {
        self.state.lock().unwrap().imports.insert(rlp.to_string(), Err(message.to_string()));
        self
    }

    /// Serve a block by hash with the given number of uncles
    pub fn block(&self, hash: &str, number: u64, uncles: usize) -> &Self {
        let block = rpc_block(hash, number, uncles);
        self.state.lock().unwrap().blocks.insert(hash.to_string(), block);
        self
    }

    /// Full transactions of a served block, one per `blockHash` entry
    pub fn transactions(&self, hash: &str, block_hashes: &[&str]) -> &Self {
        let txs: Vec<Value> = block_hashes
            .iter()
            .map(|b| json!({ "blockHash": b, "nonce": "0x0" }))
            .collect();
        if let Some(block) = self.state.lock().unwrap().blocks.get_mut(hash) {
            block["transactions"] = json!(txs);
        }
        self
    }

    /// Chain head as reported by `eth_getBlockByNumber`
    pub fn head(&self, hash: &str, number: u64, state_root: &str) -> &Self {
        let mut block = rpc_block(hash, number, 0);
        block["stateRoot"] = json!(state_root);
        self.state.lock().unwrap().head = Some(block);
        self
    }

    pub fn genesis_rlp(&self, rlp: &str) -> &Self {
        self.state.lock().unwrap().genesis_rlp = rlp.to_string();
        self
    }

    /// Account as the client holds it: `{balance, nonce, code, storage}`
    pub fn account(&self, address: &str, account: Value) -> &Self {
        self.state.lock().unwrap().accounts.insert(address.to_string(), account);
        self
    }
}

fn rpc_block(hash: &str, number: u64, uncles: usize) -> Value {
    json!({
        "hash": hash,
        "number": format!("{:#x}", number),
        "stateRoot": h("a1"),
        "totalDifficulty": "0x40000",
        "transactions": [],
        "uncles": vec![json!(h("cc")); uncles]
    })
}
