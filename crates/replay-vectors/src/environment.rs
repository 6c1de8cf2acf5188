//! Fork-family environment chosen from the genesis header
//!
//! The family decides which header fields a client must accept and which
//! validation rules apply to the imported blocks. It is chosen once, when the
//! case is parsed, and never changes afterwards.

use std::fmt;

use replay_primitives::{parse_u256, Address, HexBytes, H256, U256};
use serde_json::{json, Map, Value};

use crate::header::BlockHeader;

/// Fork family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForkFamily {
    /// Proof-of-work blocks without base fee
    Legacy,
    /// Proof-of-work blocks with an EIP-1559 base fee
    FeeMarket,
    /// Proof-of-stake blocks (difficulty zero)
    Merge,
    /// Proof-of-stake blocks carrying withdrawals
    Shanghai,
}

impl fmt::Display for ForkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForkFamily::Legacy => "Legacy",
            ForkFamily::FeeMarket => "FeeMarket(1559)",
            ForkFamily::Merge => "Merge",
            ForkFamily::Shanghai => "Shanghai",
        };
        f.write_str(name)
    }
}

/// Genesis header fields shared by every family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenesisFields {
    /// Block author
    pub coinbase: Address,
    /// Difficulty
    pub difficulty: U256,
    /// Gas limit
    pub gas_limit: U256,
    /// Timestamp
    pub timestamp: U256,
    /// Extra data
    pub extra_data: HexBytes,
    /// Seal nonce (8 bytes)
    pub nonce: HexBytes,
    /// Mix hash; carries prev-randao after the merge
    pub mix_hash: H256,
}

/// Header fields added after Shanghai; each is present only from the fork
/// that introduced it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobFields {
    /// Blob gas used (Cancun)
    pub blob_gas_used: Option<U256>,
    /// Excess blob gas (Cancun)
    pub excess_blob_gas: Option<U256>,
    /// Parent beacon block root (Cancun)
    pub parent_beacon_block_root: Option<H256>,
    /// Execution requests hash (Prague)
    pub requests_hash: Option<H256>,
}

/// Environment of one test case, one variant per fork family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Pre-London
    Legacy {
        /// Shared genesis fields
        genesis: GenesisFields,
    },
    /// London and its proof-of-work successors
    FeeMarket {
        /// Shared genesis fields
        genesis: GenesisFields,
        /// Initial base fee
        base_fee: U256,
    },
    /// Paris
    Merge {
        /// Shared genesis fields
        genesis: GenesisFields,
        /// Initial base fee
        base_fee: U256,
    },
    /// Shanghai and later
    Shanghai {
        /// Shared genesis fields
        genesis: GenesisFields,
        /// Initial base fee
        base_fee: U256,
        /// Withdrawals root of the genesis block
        withdrawals_root: H256,
        /// Cancun and Prague additions, when the genesis carries them
        blob: BlobFields,
    },
}

/// True when `difficulty` is nonzero after compact normalization
fn has_nonzero_difficulty(header: &BlockHeader) -> bool {
    header
        .get("difficulty")
        .and_then(|d| parse_u256(d).ok())
        .is_some_and(|d| !d.is_zero())
}

impl Environment {
    /// Choose the fork family from a genesis header.
    ///
    /// The checks run in a fixed order: base fee presence, then difficulty,
    /// then withdrawals root. A fee-market header with nonzero difficulty is
    /// `FeeMarket` whether or not it carries a withdrawals root.
    pub fn select(header: &BlockHeader) -> Self {
        let genesis = GenesisFields::from_header(header);
        let Some(base_fee) = header.quantity("baseFeePerGas") else {
            return Environment::Legacy { genesis };
        };
        if has_nonzero_difficulty(header) {
            return Environment::FeeMarket { genesis, base_fee };
        }
        match header.hash("withdrawalsRoot") {
            Some(withdrawals_root) => Environment::Shanghai {
                genesis,
                base_fee,
                withdrawals_root,
                blob: BlobFields {
                    blob_gas_used: header.quantity("blobGasUsed"),
                    excess_blob_gas: header.quantity("excessBlobGas"),
                    parent_beacon_block_root: header.hash("parentBeaconBlockRoot"),
                    requests_hash: header.hash("requestsHash"),
                },
            },
            None => Environment::Merge { genesis, base_fee },
        }
    }

    /// Fork family tag
    pub fn family(&self) -> ForkFamily {
        match self {
            Environment::Legacy { .. } => ForkFamily::Legacy,
            Environment::FeeMarket { .. } => ForkFamily::FeeMarket,
            Environment::Merge { .. } => ForkFamily::Merge,
            Environment::Shanghai { .. } => ForkFamily::Shanghai,
        }
    }

    /// Shared genesis fields
    pub fn genesis(&self) -> &GenesisFields {
        match self {
            Environment::Legacy { genesis }
            | Environment::FeeMarket { genesis, .. }
            | Environment::Merge { genesis, .. }
            | Environment::Shanghai { genesis, .. } => genesis,
        }
    }

    /// Initial base fee, absent for legacy genesis
    pub fn base_fee(&self) -> Option<U256> {
        match self {
            Environment::Legacy { .. } => None,
            Environment::FeeMarket { base_fee, .. }
            | Environment::Merge { base_fee, .. }
            | Environment::Shanghai { base_fee, .. } => Some(*base_fee),
        }
    }

    /// Genesis section of the chain params document
    pub fn genesis_json(&self) -> Value {
        let g = self.genesis();
        let mut genesis = Map::new();
        genesis.insert("author".into(), json!(g.coinbase.to_hex()));
        genesis.insert("difficulty".into(), json!(format!("{:#x}", g.difficulty)));
        genesis.insert("gasLimit".into(), json!(format!("{:#x}", g.gas_limit)));
        genesis.insert("extraData".into(), json!(g.extra_data.to_hex()));
        genesis.insert("timestamp".into(), json!(format!("{:#x}", g.timestamp)));
        genesis.insert("nonce".into(), json!(g.nonce.to_hex()));
        genesis.insert("mixHash".into(), json!(g.mix_hash.to_hex()));
        if let Some(base_fee) = self.base_fee() {
            genesis.insert("baseFeePerGas".into(), json!(format!("{:#x}", base_fee)));
        }
        if let Environment::Shanghai {
            withdrawals_root,
            blob,
            ..
        } = self
        {
            genesis.insert("withdrawalsRoot".into(), json!(withdrawals_root.to_hex()));
            if let Some(used) = blob.blob_gas_used {
                genesis.insert("blobGasUsed".into(), json!(format!("{:#x}", used)));
            }
            if let Some(excess) = blob.excess_blob_gas {
                genesis.insert("excessBlobGas".into(), json!(format!("{:#x}", excess)));
            }
            if let Some(root) = &blob.parent_beacon_block_root {
                genesis.insert("parentBeaconBlockRoot".into(), json!(root.to_hex()));
            }
            if let Some(hash) = &blob.requests_hash {
                genesis.insert("requestsHash".into(), json!(hash.to_hex()));
            }
        }
        Value::Object(genesis)
    }
}

impl GenesisFields {
    /// Fields a genesis header must carry
    pub const REQUIRED: &'static [&'static str] = &[
        "coinbase",
        "difficulty",
        "gasLimit",
        "timestamp",
        "extraData",
        "nonce",
        "mixHash",
    ];

    /// Check that a genesis header carries every required field and that the
    /// fixed-size ones have their exact length. Returns the offending field
    /// and reason.
    pub fn validate(header: &BlockHeader) -> Result<(), (String, String)> {
        for field in Self::REQUIRED {
            if !header.contains(field) {
                return Err((field.to_string(), "missing".to_string()));
            }
        }
        let value = |field: &str| header.get(field).unwrap_or_default();
        Address::from_hex(value("coinbase")).map_err(|e| ("coinbase".to_string(), e.to_string()))?;
        for field in ["mixHash", "withdrawalsRoot", "parentBeaconBlockRoot", "requestsHash"] {
            if header.contains(field) {
                H256::from_hex(value(field)).map_err(|e| (field.to_string(), e.to_string()))?;
            }
        }
        let nonce = HexBytes::from_hex(value("nonce")).map_err(|e| ("nonce".to_string(), e.to_string()))?;
        if nonce.len() != 8 {
            return Err(("nonce".to_string(), format!("expected 8 bytes, got {}", nonce.len())));
        }
        Ok(())
    }

    /// Read the fields from a header that passed [`GenesisFields::validate`]
    fn from_header(header: &BlockHeader) -> Self {
        let bytes = |field: &str| {
            header
                .get(field)
                .and_then(|v| HexBytes::from_hex(v).ok())
                .unwrap_or_default()
        };
        Self {
            coinbase: header
                .get("coinbase")
                .and_then(|v| Address::from_hex(v).ok())
                .unwrap_or_default(),
            difficulty: header.quantity("difficulty").unwrap_or_default(),
            gas_limit: header.quantity("gasLimit").unwrap_or_default(),
            timestamp: header.quantity("timestamp").unwrap_or_default(),
            extra_data: bytes("extraData"),
            nonce: bytes("nonce"),
            mix_hash: header.hash("mixHash").unwrap_or_default(),
        }
    }
}
