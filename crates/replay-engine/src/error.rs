//! Error types for test execution

use replay_rpc::RpcError;
use replay_vectors::{ExceptionId, VectorError};
use thiserror::Error;

fn accepted(at: &str) -> &'static str {
    if at.starts_with("block #") {
        "the block"
    } else {
        "every block"
    }
}

/// Why a single test case did not pass
#[derive(Error, Debug)]
pub enum CaseError {
    /// The case could not be parsed
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// The client rejected a block nobody expected to be rejected
    #[error("block #{block}: client rejected the block: {message}")]
    UnexpectedRejection {
        /// Block index in the case
        block: usize,
        /// Raw client text
        message: String,
    },

    /// An expected rejection never happened
    #[error("{at}: expected exception '{expected}' but the client accepted {}", accepted(.at))]
    MissingRejection {
        /// Where the rejection was due (`block #N` or `end of chain`)
        at: String,
        /// Exception the test expected
        expected: ExceptionId,
    },

    /// The client rejected the block for a different reason
    #[error("block #{block}: expected exception '{expected}' (client text should contain '{pattern}'), client said: {message}")]
    ExceptionMismatch {
        /// Block index in the case
        block: usize,
        /// Exception the test expected
        expected: ExceptionId,
        /// Pattern(s) registered for it
        pattern: String,
        /// Raw client text
        message: String,
    },

    /// The client's chain or state differs from the test
    #[error("{context}: {field} mismatch: client {actual}, test {expected}")]
    Mismatch {
        /// What was being compared (`block #1 header`, `post state 0x..`)
        context: String,
        /// Field name
        field: String,
        /// Value from the test
        expected: String,
        /// Value from the client
        actual: String,
    },

    /// The exception table has no pattern for the expected exception
    #[error("block #{block}: unmapped exception '{expected}', client said: {message}")]
    Unmapped {
        /// Block index in the case
        block: usize,
        /// Exception the test expected
        expected: ExceptionId,
        /// Raw client text
        message: String,
    },

    /// The session failed (transport, timeout, malformed reply)
    #[error("session {endpoint}: {source}")]
    Session {
        /// Client endpoint
        endpoint: String,
        /// Underlying error
        #[source]
        source: RpcError,
    },

    /// The run was cancelled while the case was in flight
    #[error("cancelled")]
    Cancelled,
}

impl CaseError {
    pub(crate) fn mismatch(
        context: impl Into<String>,
        field: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        CaseError::Mismatch {
            context: context.into(),
            field: field.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn session(endpoint: &str, source: RpcError) -> Self {
        CaseError::Session {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    /// Outcome category this error is reported under
    pub fn kind(&self) -> OutcomeKind {
        match self {
            CaseError::UnexpectedRejection { .. }
            | CaseError::MissingRejection { .. }
            | CaseError::ExceptionMismatch { .. }
            | CaseError::Mismatch { .. } => OutcomeKind::Fail,
            CaseError::Unmapped { .. } => OutcomeKind::Unmapped,
            CaseError::Vector(_) | CaseError::Session { .. } | CaseError::Cancelled => OutcomeKind::Error,
        }
    }
}

/// Result category of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Every check passed
    Pass,
    /// The client disagreed with the test
    Fail,
    /// The exception table lacks an entry the test needs
    Unmapped,
    /// The case could not be run (bad vector, session failure, cancellation)
    Error,
    /// Filtered out or not supported by the client
    Skipped,
}

/// Run-level error
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Vector file could not be loaded
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Directory walk failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Client profile is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No endpoint to run against
    #[error("no client endpoint configured")]
    NoEndpoints,
}

/// Client configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for a client config
    #[error("invalid client config: {0}")]
    Toml(#[from] toml::de::Error),

    /// An exception record names neither `id` nor `any_of`, or both
    #[error("exception record #{index}: {reason}")]
    Exception {
        /// Position in the `[[exceptions]]` list
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// A mining reward is not a decimal or hex number
    #[error("mining reward for '{fork}': {reason}")]
    Reward {
        /// Fork name
        fork: String,
        /// Parse failure
        reason: String,
    },
}

/// Case result type
pub type CaseResult<T> = Result<T, CaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let fail = CaseError::mismatch("block #1 header", "stateRoot", "0x01", "0x02");
        assert_eq!(fail.kind(), OutcomeKind::Fail);
        assert_eq!(
            fail.to_string(),
            "block #1 header: stateRoot mismatch: client 0x02, test 0x01"
        );

        let unmapped = CaseError::Unmapped {
            block: 2,
            expected: ExceptionId::single("NoSuchException"),
            message: "boom".into(),
        };
        assert_eq!(unmapped.kind(), OutcomeKind::Unmapped);
        assert_eq!(CaseError::Cancelled.kind(), OutcomeKind::Error);
    }

    #[test]
    fn test_missing_rejection_message() {
        let err = CaseError::MissingRejection {
            at: "end of chain".into(),
            expected: ExceptionId::any_of("A", "B"),
        };
        assert_eq!(
            err.to_string(),
            "end of chain: expected exception 'A|B' but the client accepted every block"
        );

        let err = CaseError::MissingRejection {
            at: "block #2".into(),
            expected: ExceptionId::single("OutOfGas"),
        };
        assert_eq!(
            err.to_string(),
            "block #2: expected exception 'OutOfGas' but the client accepted the block"
        );
    }
}
