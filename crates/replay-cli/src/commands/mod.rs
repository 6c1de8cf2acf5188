//! Subcommands

pub mod config;
pub mod exceptions;
pub mod run;
