//! Common error types for primitives

use thiserror::Error;

use crate::address::AddressError;
use crate::hash::HashError;

/// Primitive parsing error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Hash error
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Malformed hex string
    #[error("invalid hex string '{0}'")]
    InvalidHex(String),

    /// Number does not fit the target width
    #[error("value '{value}' exceeds {bits} bits")]
    Overflow {
        /// Offending input
        value: String,
        /// Width of the target type
        bits: u32,
    },
}
