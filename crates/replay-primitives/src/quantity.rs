//! Hex quantities and byte strings
//!
//! Vectors and clients disagree on leading zeros (`0x0` vs `0x00` vs `0x`),
//! so numbers are compared in one canonical form: lowercase, `0x`-prefixed,
//! leading zeros stripped, padded back to an even number of digits, and zero
//! written as `0x00`.

use std::fmt;

use primitive_types::U256;

use crate::PrimitiveError;

/// Normalize a hex quantity to its compact even-length form
pub fn compact_even_hex(s: &str) -> Result<String, PrimitiveError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PrimitiveError::InvalidHex(s.to_string()));
    }
    let trimmed = digits.trim_start_matches('0').to_ascii_lowercase();
    if trimmed.is_empty() {
        return Ok("0x00".to_string());
    }
    if trimmed.len() % 2 == 1 {
        Ok(format!("0x0{}", trimmed))
    } else {
        Ok(format!("0x{}", trimmed))
    }
}

/// Parse a hex quantity into a U256
pub fn parse_u256(s: &str) -> Result<U256, PrimitiveError> {
    let compact = compact_even_hex(s)?;
    let digits = &compact[2..];
    if digits.len() > 64 {
        return Err(PrimitiveError::Overflow {
            value: s.to_string(),
            bits: 256,
        });
    }
    U256::from_str_radix(digits, 16).map_err(|_| PrimitiveError::InvalidHex(s.to_string()))
}

/// Parse a hex quantity into a u64
pub fn parse_u64(s: &str) -> Result<u64, PrimitiveError> {
    let value = parse_u256(s)?;
    if value > U256::from(u64::MAX) {
        return Err(PrimitiveError::Overflow {
            value: s.to_string(),
            bits: 64,
        });
    }
    Ok(value.low_u64())
}

/// Decode a `0x`-prefixed byte string (`0x` alone is empty)
pub fn parse_bytes(s: &str) -> Result<Vec<u8>, PrimitiveError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(digits).map_err(|_| PrimitiveError::InvalidHex(s.to_string()))
}

/// Encode bytes as a `0x`-prefixed lowercase hex string
pub fn to_hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Arbitrary hex-encoded byte string (block RLP, code)
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    /// Parse from a hex string
    pub fn from_hex(s: &str) -> Result<Self, PrimitiveError> {
        parse_bytes(s).map(HexBytes)
    }

    /// Render as a `0x`-prefixed hex string
    pub fn to_hex(&self) -> String {
        to_hex_bytes(&self.0)
    }

    /// Borrow the raw bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexBytes({})", self.to_hex())
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        HexBytes(bytes)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::HexBytes;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for HexBytes {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for HexBytes {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            HexBytes::from_hex(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_even_hex() {
        assert_eq!(compact_even_hex("0x0").unwrap(), "0x00");
        assert_eq!(compact_even_hex("0x").unwrap(), "0x00");
        assert_eq!(compact_even_hex("0x0000").unwrap(), "0x00");
        assert_eq!(compact_even_hex("0x020000").unwrap(), "0x020000");
        assert_eq!(compact_even_hex("0x0020000").unwrap(), "0x020000");
        assert_eq!(compact_even_hex("0x1").unwrap(), "0x01");
        assert_eq!(compact_even_hex("0xABC").unwrap(), "0x0abc");
    }

    #[test]
    fn test_compact_even_hex_rejects_garbage() {
        assert!(compact_even_hex("0xzz").is_err());
    }

    #[test]
    fn test_parse_u256() {
        assert_eq!(parse_u256("0x0de0b6b3a7640000").unwrap(), U256::from(1_000_000_000_000_000_000u64));
        assert!(parse_u256("0x").unwrap().is_zero());
        let too_big = format!("0x1{}", "0".repeat(64));
        assert!(matches!(parse_u256(&too_big), Err(PrimitiveError::Overflow { bits: 256, .. })));
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("0x100").unwrap(), 256);
        assert!(parse_u64("0x010000000000000000").is_err());
    }

    #[test]
    fn test_unprefixed_quantity_is_hex() {
        assert_eq!(parse_u64("100").unwrap(), 0x100);
        assert_eq!(parse_u256("ff").unwrap(), U256::from(255u64));
        assert!(parse_u64("1e3").is_ok());
        assert!(parse_u64("12ab_").is_err());
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("0x1234").unwrap(), vec![0x12, 0x34]);
        assert!(parse_bytes("0x").unwrap().is_empty());
        assert!(parse_bytes("0x123").is_err());
    }
}
