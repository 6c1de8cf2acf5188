//! Client configuration

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use replay_primitives::{parse_u256, U256};
use replay_vectors::ExceptionId;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::exceptions::ExceptionTaxonomy;

/// Profile built into the binary
pub const DEFAULT_CLIENT_CONFIG: &str = include_str!("../clients/default.toml");

/// One `[[exceptions]]` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    /// Single exception id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Ambiguous pair of ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<String>>,
    /// Text the client includes in its rejection
    pub pattern: String,
}

impl ExceptionRecord {
    fn exception_id(&self, index: usize) -> Result<ExceptionId, ConfigError> {
        let invalid = |reason: &str| ConfigError::Exception {
            index,
            reason: reason.to_string(),
        };
        match (&self.id, &self.any_of) {
            (Some(id), None) if !id.is_empty() => Ok(ExceptionId::single(id.as_str())),
            (None, Some(pair)) => match pair.as_slice() {
                [a, b] if !a.is_empty() && !b.is_empty() => Ok(ExceptionId::any_of(a.as_str(), b.as_str())),
                _ => Err(invalid("'any_of' must name exactly two ids")),
            },
            (Some(_), Some(_)) => Err(invalid("set either 'id' or 'any_of', not both")),
            _ => Err(invalid("missing 'id' or 'any_of'")),
        }
    }
}

/// Client profile: where the client is, what it supports, how it words
/// its rejections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Display name
    pub name: String,
    /// JSON-RPC endpoints; one worker runs per endpoint
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Chain id written into the chain params
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Forks the client implements
    #[serde(default)]
    pub forks: Vec<String>,
    /// Transition forks the client implements
    #[serde(default)]
    pub additional_forks: Vec<String>,
    /// Block reward per fork, in wei
    #[serde(default)]
    pub mining_rewards: BTreeMap<String, String>,
    /// Exception table
    #[serde(default)]
    pub exceptions: Vec<ExceptionRecord>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_chain_id() -> u64 {
    1
}

impl ClientConfig {
    /// Parse TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The built-in profile
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CLIENT_CONFIG)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (index, record) in self.exceptions.iter().enumerate() {
            record.exception_id(index)?;
        }
        for fork in self.mining_rewards.keys() {
            self.mining_reward(fork)?;
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// True when the client implements `network`
    pub fn supports(&self, network: &str) -> bool {
        self.forks.iter().chain(self.additional_forks.iter()).any(|f| f == network)
    }

    /// Block reward for `fork`, if the profile lists one
    pub fn mining_reward(&self, fork: &str) -> Result<Option<U256>, ConfigError> {
        let Some(raw) = self.mining_rewards.get(fork) else {
            return Ok(None);
        };
        let parsed = if raw.starts_with("0x") {
            parse_u256(raw).map_err(|e| e.to_string())
        } else {
            U256::from_dec_str(raw).map_err(|e| format!("{:?}", e))
        };
        parsed.map(Some).map_err(|reason| ConfigError::Reward {
            fork: fork.to_string(),
            reason,
        })
    }

    /// Build the exception table
    pub fn taxonomy(&self) -> Result<ExceptionTaxonomy, ConfigError> {
        let mut taxonomy = ExceptionTaxonomy::new();
        for (index, record) in self.exceptions.iter().enumerate() {
            taxonomy.insert(record.exception_id(index)?, record.pattern.clone());
        }
        Ok(taxonomy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config() {
        let config = ClientConfig::builtin().unwrap();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.supports("London"));
        assert!(config.supports("BerlinToLondonAt5"));
        assert!(!config.supports("Osaka"));

        assert_eq!(
            config.mining_reward("Byzantium").unwrap(),
            Some(U256::from(3_000_000_000_000_000_000u64))
        );
        assert_eq!(config.mining_reward("Paris").unwrap(), Some(U256::zero()));
        assert_eq!(config.mining_reward("BerlinToLondonAt5").unwrap(), None);

        let taxonomy = config.taxonomy().unwrap();
        assert!(taxonomy.matches(&ExceptionId::single("OutOfGas"), "tx failed: out of gas"));
        assert!(taxonomy.matches(
            &ExceptionId::parse("TransactionException.INSUFFICIENT_ACCOUNT_FUNDS|TransactionException.INTRINSIC_GAS_TOO_LOW"),
            "insufficient funds for gas * price + value"
        ));
    }

    #[test]
    fn test_defaults_apply() {
        let config = ClientConfig::from_toml_str(
            r#"
            name = "minimal"
            forks = ["Cancun"]
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.chain_id, 1);
        assert!(config.endpoints.is_empty());
        assert!(config.taxonomy().unwrap().is_empty());
    }

    #[test]
    fn test_bad_exception_record() {
        let err = ClientConfig::from_toml_str(
            r#"
            name = "bad"
            [[exceptions]]
            any_of = ["OnlyOne"]
            pattern = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Exception { index: 0, .. }));
    }

    #[test]
    fn test_bad_reward() {
        let err = ClientConfig::from_toml_str(
            r#"
            name = "bad"
            [mining_rewards]
            London = "two ether"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Reward { ref fork, .. } if fork == "London"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = ClientConfig::builtin().unwrap();
        let rendered = config.to_toml_string().unwrap();
        let again = ClientConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(again.exceptions, config.exceptions);
        assert_eq!(again.forks, config.forks);
    }
}
