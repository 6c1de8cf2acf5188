//! CLI error types

use replay_engine::{ConfigError, RunnerError};
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client profile could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Run could not start or a path could not be read
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// Profile could not be rendered
    #[error("Config error: {0}")]
    Render(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run finished with failing cases
    #[error("{0} case(s) did not pass")]
    TestsFailed(usize),
}
