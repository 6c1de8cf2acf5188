//! `replay config`

use clap::Args;
use replay_engine::ClientConfig;

use crate::{output::Output, CliError};

/// Arguments of `replay config`
#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Print the effective client profile
    #[arg(long)]
    show: bool,
}

impl ConfigCommand {
    pub fn execute(self, config: &ClientConfig, json: bool) -> Result<(), CliError> {
        if !self.show {
            Output::new(json)
                .field("config_path", &display_path())
                .message(&format!(
                    "Use --show to display the client profile\nUser profile: {}",
                    display_path()
                ))
                .print();
            return Ok(());
        }

        Output::new(json)
            .field("name", &config.name)
            .field_value("endpoints", serde_json::to_value(&config.endpoints)?)
            .field_u64("timeout_secs", config.timeout_secs)
            .field_u64("chain_id", config.chain_id)
            .field_value("forks", serde_json::to_value(&config.forks)?)
            .field_value("additional_forks", serde_json::to_value(&config.additional_forks)?)
            .field_u64("exceptions", config.exceptions.len() as u64)
            .message(&config.to_toml_string()?)
            .print();
        Ok(())
    }
}

fn display_path() -> String {
    crate::config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<no home directory>".to_string())
}
