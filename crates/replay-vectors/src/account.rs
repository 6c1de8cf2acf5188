//! Account-level world state

use std::collections::BTreeMap;

use replay_primitives::{parse_u256, Address, HexBytes, U256};
use serde_json::{json, Map, Value};

use crate::error::{VectorError, VectorResult};

/// One account: balance, nonce, code and storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    /// Balance in wei
    pub balance: U256,
    /// Nonce
    pub nonce: U256,
    /// Contract code
    pub code: HexBytes,
    /// Storage slots
    pub storage: BTreeMap<U256, U256>,
}

impl AccountState {
    /// Storage value of a slot, zero when absent
    pub fn slot(&self, key: &U256) -> U256 {
        self.storage.get(key).copied().unwrap_or_default()
    }

    fn from_json(case: &str, path: &str, value: &Value) -> VectorResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| VectorError::field(case, path, "expected an object"))?;

        let quantity = |key: &str| -> VectorResult<U256> {
            let raw = object
                .get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| VectorError::field(case, format!("{}.{}", path, key), "missing or not a string"))?;
            parse_u256(raw).map_err(|e| VectorError::field(case, format!("{}.{}", path, key), e))
        };

        let code = object
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| VectorError::field(case, format!("{}.code", path), "missing or not a string"))?;
        let code = HexBytes::from_hex(code)
            .map_err(|e| VectorError::field(case, format!("{}.code", path), e))?;

        let mut storage = BTreeMap::new();
        if let Some(slots) = object.get("storage") {
            let slots = slots
                .as_object()
                .ok_or_else(|| VectorError::field(case, format!("{}.storage", path), "expected an object"))?;
            for (key, value) in slots {
                let slot_path = format!("{}.storage.{}", path, key);
                let k = parse_u256(key).map_err(|e| VectorError::field(case, &slot_path, e))?;
                let v = value
                    .as_str()
                    .ok_or_else(|| VectorError::field(case, &slot_path, "expected a hex string"))
                    .and_then(|s| parse_u256(s).map_err(|e| VectorError::field(case, &slot_path, e)))?;
                storage.insert(k, v);
            }
        }

        Ok(Self {
            balance: quantity("balance")?,
            nonce: quantity("nonce")?,
            code,
            storage,
        })
    }

    fn to_json(&self) -> Value {
        let storage: Map<String, Value> = self
            .storage
            .iter()
            .map(|(k, v)| (format!("{:#x}", k), Value::String(format!("{:#x}", v))))
            .collect();
        json!({
            "balance": format!("{:#x}", self.balance),
            "nonce": format!("{:#x}", self.nonce),
            "code": self.code.to_hex(),
            "storage": storage,
        })
    }
}

/// Address → account mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State(pub BTreeMap<Address, AccountState>);

impl State {
    /// Parse a `pre` / `postState` section
    pub fn from_json(case: &str, path: &str, value: &Value) -> VectorResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| VectorError::field(case, path, "expected an object"))?;
        let mut accounts = BTreeMap::new();
        for (address, account) in object {
            let account_path = format!("{}.{}", path, address);
            let parsed = Address::from_hex(address)
                .map_err(|e| VectorError::field(case, &account_path, e))?;
            accounts.insert(parsed, AccountState::from_json(case, &account_path, account)?);
        }
        Ok(State(accounts))
    }

    /// Render in vector layout (used for the chain params `accounts` section)
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(address, account)| (address.to_hex(), account.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Look up an account
    pub fn get(&self, address: &Address) -> Option<&AccountState> {
        self.0.get(address)
    }

    /// Iterate accounts in address order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountState)> {
        self.0.iter()
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no accounts are listed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        let value = json!({
            "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b": {
                "balance": "0x0de0b6b3a7640000",
                "code": "0x6001600055",
                "nonce": "0x00",
                "storage": { "0x00": "0x01" }
            }
        });
        let state = State::from_json("t", "pre", &value).unwrap();
        let address = Address::from_hex("0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b").unwrap();
        let account = state.get(&address).unwrap();
        assert_eq!(account.balance, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(account.code.as_slice(), &[0x60, 0x01, 0x60, 0x00, 0x55]);
        assert_eq!(account.slot(&U256::zero()), U256::one());
        assert_eq!(account.slot(&U256::from(7u64)), U256::zero());
    }

    #[test]
    fn test_bad_balance_names_field_path() {
        let value = json!({
            "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b": {
                "balance": "0xzz", "code": "0x", "nonce": "0x00", "storage": {}
            }
        });
        let err = State::from_json("case1", "pre", &value).unwrap_err();
        match err {
            VectorError::Field { case, path, .. } => {
                assert_eq!(case, "case1");
                assert_eq!(path, "pre.0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b.balance");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_to_json_roundtrip_values() {
        let value = json!({
            "0x1000000000000000000000000000000000000000": {
                "balance": "0x10", "code": "0x", "nonce": "0x01", "storage": {"0x01": "0x02"}
            }
        });
        let state = State::from_json("t", "pre", &value).unwrap();
        let rendered = state.to_json();
        let account = &rendered["0x1000000000000000000000000000000000000000"];
        assert_eq!(account["balance"], "0x10");
        assert_eq!(account["nonce"], "0x1");
        assert_eq!(account["storage"]["0x1"], "0x2");
    }
}
