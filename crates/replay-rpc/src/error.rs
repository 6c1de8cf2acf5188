//! Session error types

use thiserror::Error;

/// Error from one RPC call
#[derive(Debug, Error)]
pub enum RpcError {
    /// Request could not be delivered or the reply could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// No reply within the per-call timeout
    #[error("RPC call '{method}' timed out after {millis} ms")]
    Timeout {
        /// Method name
        method: String,
        /// Timeout in milliseconds
        millis: u128,
    },

    /// The client answered with a JSON-RPC error object
    #[error("RPC error: {code} - {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message as the client wrote it
        message: String,
    },

    /// The reply does not have the expected shape
    #[error("unexpected reply to '{method}': {message}")]
    Decode {
        /// Method name
        method: String,
        /// What was wrong
        message: String,
    },
}

impl RpcError {
    /// True when the call itself failed, as opposed to the client rejecting it
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, RpcError::Rpc { .. })
    }

    /// Client-supplied message of a rejection
    pub fn client_message(&self) -> Option<&str> {
        match self {
            RpcError::Rpc { message, .. } => Some(message),
            _ => None,
        }
    }

    pub(crate) fn decode(method: &str, message: impl ToString) -> Self {
        RpcError::Decode {
            method: method.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}
