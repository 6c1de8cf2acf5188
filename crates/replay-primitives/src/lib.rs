//! # replay-primitives
//!
//! Primitive types shared by the Replay crates.
//!
//! Test vectors and JSON-RPC responses carry every value as a `0x`-prefixed
//! hex string. This crate provides the fixed-size types (hashes, addresses),
//! arbitrary byte strings, and the canonical numeric form used to compare
//! quantities regardless of how many leading zeros a client or vector wrote.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;
mod quantity;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{HashError, H256};
pub use quantity::{compact_even_hex, parse_bytes, parse_u256, parse_u64, to_hex_bytes, HexBytes};

// Re-export primitive-types for U256
pub use primitive_types::U256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_reexport() {
        let a = parse_u256("0x64").unwrap();
        assert_eq!(a, U256::from(100u64));
    }
}
