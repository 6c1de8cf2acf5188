//! Block entries of a test case

use replay_primitives::HexBytes;
use serde_json::Value;

use crate::error::{VectorError, VectorResult};
use crate::exception::ExceptionId;
use crate::header::BlockHeader;

/// What the vector says the client should report after importing a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBlock {
    /// Expected header
    pub header: BlockHeader,
    /// Expected transactions (only the count is checked)
    pub transactions: Vec<Value>,
    /// Expected uncle headers (only the count is checked)
    pub uncles: Vec<Value>,
}

/// How much of an import is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockCheck {
    /// Only success or failure of the import call matters
    Blind,
    /// Header, transaction count and uncle count are compared
    Verified(VerifiedBlock),
}

/// One block of a test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    /// Position in the vector's block list
    pub index: usize,
    /// Raw encoded block
    pub rlp: HexBytes,
    /// Rejection this block must produce, if any
    pub expect_exception: Option<ExceptionId>,
    /// Post-import verification
    pub check: BlockCheck,
}

impl BlockEntry {
    pub(crate) fn from_json(case: &str, index: usize, value: &Value) -> VectorResult<Self> {
        let path = format!("blocks[{}]", index);
        let object = value
            .as_object()
            .ok_or_else(|| VectorError::field(case, &path, "expected an object"))?;

        let rlp = object
            .get("rlp")
            .and_then(Value::as_str)
            .ok_or_else(|| VectorError::field(case, format!("{}.rlp", path), "missing or not a string"))?;
        let rlp = HexBytes::from_hex(rlp)
            .map_err(|e| VectorError::field(case, format!("{}.rlp", path), e))?;

        let expect_exception = match object.get("expectException") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(ExceptionId::parse(s)),
            Some(_) => {
                return Err(VectorError::field(
                    case,
                    format!("{}.expectException", path),
                    "expected a string",
                ))
            }
        };

        let check = match object.get("blockHeader") {
            None => BlockCheck::Blind,
            Some(header) => {
                let header = header.as_object().ok_or_else(|| {
                    VectorError::field(case, format!("{}.blockHeader", path), "expected an object")
                })?;
                let header = BlockHeader::from_json(header).map_err(|(field, reason)| {
                    VectorError::field(case, format!("{}.blockHeader.{}", path, field), reason)
                })?;
                BlockCheck::Verified(VerifiedBlock {
                    header,
                    transactions: array(case, &path, object.get("transactions"), "transactions")?,
                    uncles: array(case, &path, object.get("uncleHeaders"), "uncleHeaders")?,
                })
            }
        };

        Ok(Self {
            index,
            rlp,
            expect_exception,
            check,
        })
    }

    /// True when the entry carries post-import expectations
    pub fn is_verified(&self) -> bool {
        matches!(self.check, BlockCheck::Verified(_))
    }
}

fn array(case: &str, path: &str, value: Option<&Value>, key: &str) -> VectorResult<Vec<Value>> {
    match value {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(VectorError::field(case, format!("{}.{}", path, key), "expected an array")),
        None => Err(VectorError::field(
            case,
            format!("{}.{}", path, key),
            "required when blockHeader is present",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blind_entry() {
        let entry = BlockEntry::from_json(
            "t",
            2,
            &json!({"rlp": "0xf90200", "expectException": "InvalidGasLimit"}),
        )
        .unwrap();
        assert_eq!(entry.index, 2);
        assert_eq!(entry.check, BlockCheck::Blind);
        assert_eq!(entry.expect_exception, Some(ExceptionId::single("InvalidGasLimit")));
    }

    #[test]
    fn test_verified_entry() {
        let entry = BlockEntry::from_json(
            "t",
            0,
            &json!({
                "rlp": "0xf90200",
                "blockHeader": {"number": "0x01", "gasUsed": "0x5208"},
                "transactions": [{"nonce": "0x00"}],
                "uncleHeaders": []
            }),
        )
        .unwrap();
        match entry.check {
            BlockCheck::Verified(v) => {
                assert_eq!(v.transactions.len(), 1);
                assert!(v.uncles.is_empty());
                assert_eq!(v.header.get("number"), Some("0x01"));
            }
            BlockCheck::Blind => panic!("expected verified entry"),
        }
    }

    #[test]
    fn test_verified_entry_requires_transactions() {
        let err = BlockEntry::from_json(
            "t",
            0,
            &json!({"rlp": "0x00", "blockHeader": {}, "uncleHeaders": []}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("blocks[0].transactions"));
    }
}
