//! Reply types

use replay_primitives::{parse_u64, H256};
use replay_vectors::BlockHeader;
use serde::Serialize;
use serde_json::Value;

use crate::RpcError;

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Block number
    Number(u64),
    /// Latest block
    #[default]
    Latest,
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            BlockId::Number(n) => serializer.serialize_str(&format!("0x{:x}", n)),
            BlockId::Latest => serializer.serialize_str("latest"),
        }
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        BlockId::Number(n)
    }
}

/// Block as reported by the client
#[derive(Debug, Clone)]
pub struct RpcBlock {
    /// Block hash
    pub hash: H256,
    /// Block number
    pub number: u64,
    /// Header in canonical field naming
    pub header: BlockHeader,
    /// Transactions: objects when fetched with full transactions, else hashes
    pub transactions: Vec<Value>,
    /// Uncle hashes
    pub uncles: Vec<Value>,
}

impl RpcBlock {
    pub(crate) fn from_json(method: &str, value: Value) -> Result<Self, RpcError> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Err(RpcError::decode(method, "block not found")),
            other => return Err(RpcError::decode(method, format!("expected a block object, got {}", other))),
        };

        let header = BlockHeader::from_json(&object)
            .map_err(|(field, reason)| RpcError::decode(method, format!("field '{}': {}", field, reason)))?;
        let hash = header
            .hash("hash")
            .ok_or_else(|| RpcError::decode(method, "block has no hash"))?;
        let number = object
            .get("number")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::decode(method, "block has no number"))
            .and_then(|n| parse_u64(n).map_err(|e| RpcError::decode(method, e)))?;

        let list = |key: &str| -> Result<Vec<Value>, RpcError> {
            match object.get(key) {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(Value::Array(items)) => Ok(items.clone()),
                Some(_) => Err(RpcError::decode(method, format!("'{}' is not an array", key))),
            }
        };

        Ok(Self {
            hash,
            number,
            header,
            transactions: list("transactions")?,
            uncles: list("uncles")?,
        })
    }

    /// `blockHash` of every full transaction object; `None` for entries
    /// that carry no parsable hash
    pub fn transaction_block_hashes(&self) -> Vec<Option<H256>> {
        self.transactions
            .iter()
            .map(|tx| {
                tx.get("blockHash")
                    .and_then(Value::as_str)
                    .and_then(|h| H256::from_hex(h).ok())
            })
            .collect()
    }
}
