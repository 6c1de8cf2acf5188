//! # replay
//!
//! Runs blockchain conformance test vectors against an execution client.
//!
//! ## Usage
//!
//! ```bash
//! # Run a directory of vectors against a local client
//! replay run tests/BlockchainTests --rpc-url http://127.0.0.1:8545
//!
//! # One test, one network, two client instances
//! replay run suite.json --singletest transfer --singlenet London \
//!     --rpc-url http://127.0.0.1:8545 --rpc-url http://127.0.0.1:8546
//!
//! # Inspect the client profile
//! replay exceptions --filter NONCE
//! replay config --show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod error;
mod output;

use error::CliError;

/// Blockchain conformance test runner
#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Client profile (TOML); defaults to ~/.replay/client.toml, then the built-in profile
    #[arg(long, global = true)]
    client_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run test vectors against a client
    Run(commands::run::RunCommand),
    /// List the client's exception table
    Exceptions(commands::exceptions::ExceptionsCommand),
    /// Show the client profile
    Config(commands::config::ConfigCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli.command, cli.client_config, cli.json).await {
        let reported = matches!(e.downcast_ref::<CliError>(), Some(CliError::TestsFailed(_)));
        if cli.json {
            // a failed run already printed its report as the JSON document
            if !reported {
                println!(
                    "{}",
                    serde_json::json!({
                        "error": e.to_string(),
                        "success": false
                    })
                );
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

async fn run(command: Commands, client_config: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let config = config::load_client_config(client_config.as_deref())?;

    match command {
        Commands::Run(cmd) => {
            let (cancel, cancelled) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, abandoning in-flight tests");
                    let _ = cancel.send(true);
                }
            });
            cmd.execute(config, cancelled, json).await?
        }
        Commands::Exceptions(cmd) => cmd.execute(&config, json)?,
        Commands::Config(cmd) => cmd.execute(&config, json)?,
    }
    Ok(())
}
