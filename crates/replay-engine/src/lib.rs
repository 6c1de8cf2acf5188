//! # replay-engine
//!
//! Blockchain test execution engine.
//!
//! A case is run by pushing its genesis and pre-state to the client
//! ([`chain_params`]), importing its blocks in order ([`run_blocks`]) and
//! checking the resulting chain and state ([`validate_final_state`]). Block
//! rejections are reconciled with the test's expected exceptions through the
//! client's [`ExceptionTaxonomy`]. The [`Runner`] does this for every case of
//! a vector file, one worker per client endpoint.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod chain_params;
mod config;
mod driver;
mod error;
mod exceptions;
mod report;
mod runner;
mod validator;

pub use chain_params::chain_params;
pub use config::{ClientConfig, ExceptionRecord, DEFAULT_CLIENT_CONFIG};
pub use driver::{run_blocks, ImportSummary};
pub use error::{CaseError, CaseResult, ConfigError, OutcomeKind, RunnerError};
pub use exceptions::{ExceptionTaxonomy, MatchOutcome};
pub use report::{CaseReport, FileReport, RunSummary, TestStats};
pub use runner::{collect_vector_files, RunOptions, Runner};
pub use validator::validate_final_state;
