//! `replay exceptions`

use clap::Args;
use replay_engine::ClientConfig;
use serde_json::{json, Value};

use crate::{output::Output, CliError};

/// Arguments of `replay exceptions`
#[derive(Debug, Args)]
pub struct ExceptionsCommand {
    /// Only list ids containing this text
    #[arg(long)]
    filter: Option<String>,
}

impl ExceptionsCommand {
    pub fn execute(self, config: &ClientConfig, json: bool) -> Result<(), CliError> {
        let taxonomy = config.taxonomy()?;
        let entries: Vec<(String, &str)> = taxonomy
            .iter()
            .map(|(id, pattern)| (id.to_string(), pattern))
            .filter(|(id, _)| self.filter.as_deref().map_or(true, |f| id.contains(f)))
            .collect();

        let listed: Vec<Value> = entries
            .iter()
            .map(|(id, pattern)| json!({ "id": id, "pattern": pattern }))
            .collect();

        let mut out = Output::new(json)
            .field("client", &config.name)
            .field_u64("count", entries.len() as u64)
            .field_value("exceptions", Value::Array(listed));
        for (id, pattern) in &entries {
            out = out.line(format!("{} => \"{}\"", id, pattern));
        }
        out.line(format!("{} exception(s) for {}", entries.len(), config.name))
            .print();
        Ok(())
    }
}
