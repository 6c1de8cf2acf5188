//! # replay-vectors
//!
//! Typed model of filled blockchain test vectors.
//!
//! A vector file is a JSON object mapping test names to test cases. Each case
//! is parsed on its own so a malformed case is reported with its name and
//! field path while its neighbours in the file still run.
//!
//! ## Contents
//!
//! - [`TestVectorFile`] and [`TestCase`]: the parsed vector
//! - [`BlockEntry`] with an explicit [`BlockCheck`] (blind or verified import)
//! - [`Environment`]: the fork family chosen from the genesis header
//! - [`ExceptionId`]: canonical exception identifiers, single or compound
//! - [`BlockHeader`]: header fields normalized for field-by-field comparison

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod block;
mod environment;
mod error;
mod exception;
mod header;
mod test_case;

pub use account::{AccountState, State};
pub use block::{BlockCheck, BlockEntry, VerifiedBlock};
pub use environment::{BlobFields, Environment, ForkFamily, GenesisFields};
pub use error::{VectorError, VectorResult};
pub use exception::ExceptionId;
pub use header::BlockHeader;
pub use test_case::{Info, PostExpectation, SealEngine, TestCase, TestVectorFile};
