//! Block header normalized for comparison
//!
//! Vectors and JSON-RPC responses name some header fields differently
//! (`coinbase`/`miner`, `uncleHash`/`sha3Uncles`, ...) and write quantities
//! with varying leading zeros. A [`BlockHeader`] stores every known field under
//! its vector name with a canonical value, so two headers are equal exactly
//! when every field agrees.

use std::collections::BTreeMap;

use replay_primitives::{compact_even_hex, parse_bytes, parse_u256, to_hex_bytes, H256, U256};
use serde_json::{Map, Value};

/// Numeric header fields, compared in compact form
const QUANTITY_FIELDS: &[&str] = &[
    "difficulty",
    "gasLimit",
    "gasUsed",
    "number",
    "timestamp",
    "baseFeePerGas",
    "blobGasUsed",
    "excessBlobGas",
];

/// Byte-string header fields, compared as lowercase hex
const DATA_FIELDS: &[&str] = &[
    "bloom",
    "coinbase",
    "extraData",
    "hash",
    "mixHash",
    "nonce",
    "parentHash",
    "receiptTrie",
    "stateRoot",
    "transactionsTrie",
    "uncleHash",
    "withdrawalsRoot",
    "parentBeaconBlockRoot",
    "requestsHash",
];

/// JSON-RPC field name → vector field name
const RPC_ALIASES: &[(&str, &str)] = &[
    ("miner", "coinbase"),
    ("author", "coinbase"),
    ("sha3Uncles", "uncleHash"),
    ("logsBloom", "bloom"),
    ("transactionsRoot", "transactionsTrie"),
    ("receiptsRoot", "receiptTrie"),
];

fn canonical_name(key: &str) -> Option<&'static str> {
    if let Some((_, name)) = RPC_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return Some(name);
    }
    QUANTITY_FIELDS
        .iter()
        .chain(DATA_FIELDS.iter())
        .find(|name| **name == key)
        .copied()
}

/// Block header with canonical field names and values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    fields: BTreeMap<&'static str, String>,
}

impl BlockHeader {
    /// Build from a JSON object in either vector or JSON-RPC naming.
    ///
    /// Unknown keys are ignored. Returns the offending field and reason when a
    /// known field is not a valid hex string.
    pub fn from_json(object: &Map<String, Value>) -> Result<Self, (String, String)> {
        let mut fields = BTreeMap::new();
        for (key, value) in object {
            let Some(name) = canonical_name(key) else {
                continue;
            };
            let raw = value
                .as_str()
                .ok_or_else(|| (key.clone(), "expected a hex string".to_string()))?;
            let normalized = if QUANTITY_FIELDS.contains(&name) {
                parse_u256(raw).map_err(|e| (key.clone(), e.to_string()))?;
                compact_even_hex(raw).map_err(|e| (key.clone(), e.to_string()))?
            } else {
                let bytes = parse_bytes(raw).map_err(|e| (key.clone(), e.to_string()))?;
                to_hex_bytes(&bytes)
            };
            fields.insert(name, normalized);
        }
        Ok(Self { fields })
    }

    /// Canonical value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// True when the field is present
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Numeric field value
    pub fn quantity(&self, field: &str) -> Option<U256> {
        self.get(field).and_then(|v| parse_u256(v).ok())
    }

    /// 32-byte field value
    pub fn hash(&self, field: &str) -> Option<H256> {
        self.get(field).and_then(|v| H256::from_hex(v).ok())
    }

    /// Fields whose values differ, as `(field, self, other)`; absent is `-`
    pub fn diff(&self, other: &BlockHeader) -> Vec<(String, String, String)> {
        let mut names: Vec<&&'static str> = self.fields.keys().chain(other.fields.keys()).collect();
        names.sort();
        names.dedup();
        names
            .into_iter()
            .filter_map(|name| {
                let ours = self.get(name);
                let theirs = other.get(name);
                (ours != theirs).then(|| {
                    (
                        name.to_string(),
                        ours.unwrap_or("-").to_string(),
                        theirs.unwrap_or("-").to_string(),
                    )
                })
            })
            .collect()
    }

    /// Render as a JSON object using vector field names
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rpc_and_vector_names_agree() {
        let vector = BlockHeader::from_json(&object(json!({
            "coinbase": "0x8888F1F195AFA192CFEE860698584C030F4C9DB1",
            "uncleHash": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
            "gasLimit": "0x0f4240",
            "number": "0x01"
        })))
        .unwrap();
        let rpc = BlockHeader::from_json(&object(json!({
            "miner": "0x8888f1f195afa192cfee860698584c030f4c9db1",
            "sha3Uncles": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
            "gasLimit": "0xf4240",
            "number": "0x1",
            "size": "0x200",
            "totalDifficulty": "0x20000"
        })))
        .unwrap();
        assert_eq!(vector, rpc);
        assert!(vector.diff(&rpc).is_empty());
    }

    #[test]
    fn test_diff_reports_field() {
        let a = BlockHeader::from_json(&object(json!({"gasUsed": "0x5208"}))).unwrap();
        let b = BlockHeader::from_json(&object(json!({"gasUsed": "0x00"}))).unwrap();
        let diff = a.diff(&b);
        assert_eq!(diff, vec![("gasUsed".to_string(), "0x5208".to_string(), "0x00".to_string())]);
    }

    #[test]
    fn test_non_string_value_is_rejected() {
        let err = BlockHeader::from_json(&object(json!({"number": 1}))).unwrap_err();
        assert_eq!(err.0, "number");
    }

    #[test]
    fn test_quantity_accessor() {
        let h = BlockHeader::from_json(&object(json!({"difficulty": "0x020000"}))).unwrap();
        assert_eq!(h.quantity("difficulty"), Some(U256::from(0x20000u64)));
        assert_eq!(h.quantity("baseFeePerGas"), None);
    }
}
