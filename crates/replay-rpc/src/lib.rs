//! # replay-rpc
//!
//! JSON-RPC session used to drive an execution client through a test.
//!
//! The [`Transport`] trait is the seam between the session and the wire:
//! [`HttpTransport`] talks to a real client, [`MockTransport`] replays a
//! script so the engine can be tested without one.
//!
//! ```rust,no_run
//! use replay_rpc::{BlockId, ClientSession, DEFAULT_CALL_TIMEOUT};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), replay_rpc::RpcError> {
//!     let session = ClientSession::connect("http://127.0.0.1:8545", DEFAULT_CALL_TIMEOUT);
//!     let head = session.get_block_by_number(BlockId::Latest, false).await?;
//!     println!("head {} at {}", head.hash, head.number);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod error;
mod session;
mod transport;
mod types;

pub use error::RpcError;
pub use session::{ClientSession, DEFAULT_CALL_TIMEOUT};
pub use transport::{MockTransport, Transport};
pub use types::{BlockId, RpcBlock};

#[cfg(feature = "http")]
pub use transport::HttpTransport;
