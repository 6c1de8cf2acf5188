//! `replay run`

use std::path::PathBuf;

use clap::Args;
use replay_engine::{ClientConfig, FileReport, OutcomeKind, RunOptions, RunSummary, Runner};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{output::Output, CliError};

/// Arguments of `replay run`
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Vector files or directories to walk for `*.json`
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Client RPC endpoint; repeat for one worker per endpoint
    #[arg(long = "rpc-url")]
    rpc_urls: Vec<String>,

    /// Run only the test with this name
    #[arg(long)]
    singletest: Option<String>,

    /// Run only tests for this network
    #[arg(long)]
    singlenet: Option<String>,

    /// Tolerate block rejections the test does not expect
    #[arg(long)]
    allow_invalid_blocks: bool,

    /// Stop a file at its first failing test
    #[arg(long)]
    stop_on_failure: bool,

    /// Accept extra accounts and storage in the client's post-state
    #[arg(long)]
    no_exhaustive_state: bool,

    /// Per-call RPC timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl RunCommand {
    pub async fn execute(
        self,
        mut config: ClientConfig,
        cancel: watch::Receiver<bool>,
        json: bool,
    ) -> Result<(), CliError> {
        if !self.rpc_urls.is_empty() {
            config.endpoints = self.rpc_urls;
        }
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err(CliError::InvalidInput("--timeout must be at least 1 second".to_string()));
            }
            config.timeout_secs = timeout;
        }
        let options = RunOptions {
            singletest: self.singletest,
            singlenet: self.singlenet,
            allow_invalid_blocks: self.allow_invalid_blocks,
            stop_on_failure: self.stop_on_failure,
            exhaustive_state: !self.no_exhaustive_state,
        };

        info!("Running against {} ({} endpoint(s))", config.name, config.endpoints.len());
        let mut runner = Runner::connect(config, options)?.with_cancel(cancel);

        let mut summary = RunSummary::default();
        for path in &self.paths {
            let part = match runner.run_path(path).await {
                Ok(part) => part,
                Err(e) => {
                    warn!("Cannot read {:?}: {}", path, e);
                    summary.push(FileReport::unreadable(path.display().to_string(), e));
                    continue;
                }
            };
            summary.stats.duration += part.stats.duration;
            for file in part.files {
                summary.push(file);
            }
            if part.cancelled {
                summary.cancelled = true;
                break;
            }
        }

        report(&summary, json)?.print();

        if summary.stats.is_success() && !summary.cancelled {
            Ok(())
        } else {
            let stats = &summary.stats;
            Err(CliError::TestsFailed(
                stats.failed + stats.unmapped + stats.errors + stats.file_errors,
            ))
        }
    }
}

fn report(summary: &RunSummary, json: bool) -> Result<Output, CliError> {
    if json {
        return Ok(Output::new(true)
            .field_value("files", serde_json::to_value(&summary.files)?)
            .field_value("stats", serde_json::to_value(&summary.stats)?)
            .field_u64("duration_ms", summary.stats.duration.as_millis() as u64)
            .field_value("cancelled", summary.cancelled.into()));
    }

    let mut out = Output::new(false);
    for file in &summary.files {
        out = file_lines(out, file);
    }
    if summary.cancelled {
        out = out.line("Run cancelled");
    }
    Ok(out.line(summary.stats.to_string()))
}

fn file_lines(mut out: Output, file: &FileReport) -> Output {
    out = out.line(format!("{}:", file.source));
    if let Some(error) = &file.error {
        return out.line(format!("  ERROR {}", error));
    }
    for case in &file.cases {
        let tag = match case.outcome {
            OutcomeKind::Pass => "PASS",
            OutcomeKind::Fail => "FAIL",
            OutcomeKind::Unmapped => "UNMAPPED",
            OutcomeKind::Error => "ERROR",
            // filtered cases are only visible in the counts
            OutcomeKind::Skipped => continue,
        };
        out = match &case.message {
            Some(message) => out.line(format!("  {} {}: {}", tag, case.name, message)),
            None => out.line(format!("  {} {}", tag, case.name)),
        };
    }
    if file.stopped {
        out = out.line("  (stopped after first failure)");
    }
    out
}
