//! Test suite orchestration

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use replay_primitives::U256;
use replay_rpc::ClientSession;
use replay_vectors::{TestCase, TestVectorFile};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::chain_params::chain_params;
use crate::config::ClientConfig;
use crate::driver::run_blocks;
use crate::error::{CaseError, CaseResult, ConfigError, OutcomeKind, RunnerError};
use crate::exceptions::ExceptionTaxonomy;
use crate::report::{CaseReport, FileReport, RunSummary};
use crate::validator::validate_final_state;

/// Run options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run only the case with this name
    pub singletest: Option<String>,
    /// Run only cases for this network
    pub singlenet: Option<String>,
    /// Tolerate rejections nobody expected
    pub allow_invalid_blocks: bool,
    /// Stop a file at its first failing case
    pub stop_on_failure: bool,
    /// Reject accounts and storage the expected post-state does not list
    pub exhaustive_state: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            singletest: None,
            singlenet: None,
            allow_invalid_blocks: false,
            stop_on_failure: false,
            exhaustive_state: true,
        }
    }
}

/// Read-only state every worker shares
struct CaseContext {
    taxonomy: ExceptionTaxonomy,
    rewards: BTreeMap<String, U256>,
    chain_id: u64,
    options: RunOptions,
}

struct Job {
    position: usize,
    name: String,
    value: Value,
}

/// Runs vector files against one or more client sessions.
///
/// Each session is driven by its own worker task, one case at a time.
pub struct Runner {
    config: Arc<ClientConfig>,
    context: Arc<CaseContext>,
    sessions: Vec<ClientSession>,
    cancel: watch::Receiver<bool>,
    // Keeps the default channel open so `cancel` never reports closed
    _cancel_guard: Option<watch::Sender<bool>>,
}

impl Runner {
    /// Create a runner over the given sessions
    pub fn new(config: ClientConfig, sessions: Vec<ClientSession>, options: RunOptions) -> Result<Self, RunnerError> {
        if sessions.is_empty() {
            return Err(RunnerError::NoEndpoints);
        }
        let taxonomy = config.taxonomy()?;
        let rewards = config
            .mining_rewards
            .keys()
            .filter_map(|fork| match config.mining_reward(fork) {
                Ok(reward) => reward.map(|r| Ok((fork.clone(), r))),
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let (guard, cancel) = watch::channel(false);
        Ok(Self {
            context: Arc::new(CaseContext {
                taxonomy,
                rewards,
                chain_id: config.chain_id,
                options,
            }),
            config: Arc::new(config),
            sessions,
            cancel,
            _cancel_guard: Some(guard),
        })
    }

    /// Create a runner with one HTTP session per configured endpoint
    pub fn connect(config: ClientConfig, options: RunOptions) -> Result<Self, RunnerError> {
        let timeout = config.timeout();
        let sessions = config
            .endpoints
            .iter()
            .map(|url| ClientSession::connect(url, timeout))
            .collect();
        Self::new(config, sessions, options)
    }

    /// Abandon in-flight cases once `cancel` turns true
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self._cancel_guard = None;
        self
    }

    /// Client profile in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of worker sessions
    pub fn workers(&self) -> usize {
        self.sessions.len()
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Run every file under `path` (or `path` itself when it is a file)
    pub async fn run_path(&mut self, path: &Path) -> Result<RunSummary, RunnerError> {
        let started = Instant::now();
        let files = collect_vector_files(path)?;
        info!("Running {} vector file(s) from {:?}", files.len(), path);

        let mut summary = RunSummary::default();
        for file in files {
            if self.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let report = match self.run_file(&file).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Skipping unreadable file {:?}: {}", file, e);
                    FileReport::unreadable(file.display().to_string(), e)
                }
            };
            summary.push(report);
        }
        summary.stats.duration = started.elapsed();
        Ok(summary)
    }

    /// Run every case in one file
    pub async fn run_file(&mut self, path: &Path) -> Result<FileReport, RunnerError> {
        let file = TestVectorFile::from_path(path)?;
        Ok(self.run_vector(&path.display().to_string(), &file).await)
    }

    /// Run every case of a parsed vector file
    pub async fn run_vector(&mut self, source: &str, file: &TestVectorFile) -> FileReport {
        let started = Instant::now();
        let mut report = FileReport {
            source: source.to_string(),
            ..FileReport::default()
        };

        let mut slots: Vec<Option<CaseReport>> = Vec::with_capacity(file.len());
        let mut queue = VecDeque::new();
        for (position, (name, value)) in file.iter().enumerate() {
            slots.push(None);
            if let Some(reason) = self.skip_reason(name, value) {
                debug!("SKIP: {} - {}", name, reason);
                slots[position] = Some(CaseReport::skipped(name, reason));
                continue;
            }
            queue.push_back(Job {
                position,
                name: name.to_string(),
                value: value.clone(),
            });
        }
        let queued = queue.len();
        let workers = self.sessions.len();
        info!("{}: {} case(s), {} to run on {} worker(s)", source, file.len(), queued, workers);

        let jobs = Arc::new(Mutex::new(queue));
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(self.sessions.len());
        for session in self.sessions.drain(..) {
            handles.push(tokio::spawn(worker(
                session,
                Arc::clone(&self.context),
                Arc::clone(&jobs),
                tx.clone(),
                self.cancel.clone(),
                Arc::clone(&stop),
            )));
        }
        drop(tx);

        while let Some((position, case)) = rx.recv().await {
            slots[position] = Some(case);
        }

        let mut worker_failed = false;
        for handle in handles {
            match handle.await {
                Ok(session) => self.sessions.push(session),
                Err(e) => {
                    error!("worker task failed: {}", e);
                    worker_failed = true;
                }
            }
        }

        report.cancelled = self.is_cancelled();
        report.stopped = stop.load(Ordering::SeqCst);
        if report.stopped {
            let left: Vec<Job> = jobs.lock().drain(..).collect();
            for job in left {
                slots[job.position] = Some(CaseReport::skipped(job.name, "not run: stopped after a failure"));
            }
        }
        // Cases abandoned by a cancel are left out; anything else without a
        // result was lost with its worker
        if !report.cancelled {
            let reason = if workers == 0 {
                "not run: no client session left"
            } else if worker_failed {
                "not run: worker failed"
            } else {
                "not run: no result received"
            };
            for (slot, (name, _)) in slots.iter_mut().zip(file.iter()) {
                if slot.is_none() {
                    *slot = Some(CaseReport::lost(name, reason));
                }
            }
        }
        report.cases = slots.into_iter().flatten().collect();
        report.duration_ms = started.elapsed().as_millis() as u64;

        let stats = report.stats();
        info!(
            "{}: {} passed, {} failed, {} unmapped, {} errors, {} skipped",
            source, stats.passed, stats.failed, stats.unmapped, stats.errors, stats.skipped
        );
        report
    }

    fn skip_reason(&self, name: &str, value: &Value) -> Option<String> {
        let options = &self.context.options;
        if let Some(single) = &options.singletest {
            if name != single {
                return Some(format!("filtered out: test name is not '{}'", single));
            }
        }
        // Cases without a readable network are left to the parser to report
        let network = TestCase::network_of(value)?;
        if let Some(net) = &options.singlenet {
            if network != net {
                return Some(format!("filtered out: network '{}' is not '{}'", network, net));
            }
        }
        if !self.config.supports(network) {
            return Some(format!("network '{}' not supported by {}", network, self.config.name));
        }
        None
    }
}

async fn worker(
    session: ClientSession,
    context: Arc<CaseContext>,
    jobs: Arc<Mutex<VecDeque<Job>>>,
    results: mpsc::UnboundedSender<(usize, CaseReport)>,
    mut cancel: watch::Receiver<bool>,
    stop: Arc<AtomicBool>,
) -> ClientSession {
    loop {
        if stop.load(Ordering::SeqCst) || *cancel.borrow() {
            break;
        }
        let Some(job) = jobs.lock().pop_front() else {
            break;
        };

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => Err(CaseError::Cancelled),
            result = run_case(&session, &context, &job.name, &job.value) => result,
        };
        let report = CaseReport::finished(&job.name, session.endpoint(), result, started.elapsed());
        match report.outcome {
            OutcomeKind::Pass => info!("PASS: {}", job.name),
            _ => warn!("{:?}: {} - {}", report.outcome, job.name, report.message.as_deref().unwrap_or("")),
        }
        // Set before the report is handed over so no worker starts another case
        if report.is_failure() && context.options.stop_on_failure {
            stop.store(true, Ordering::SeqCst);
        }

        if results.send((job.position, report)).is_err() {
            break;
        }
    }
    session
}

/// Resolves once the cancel flag is set; never when the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_case(session: &ClientSession, context: &CaseContext, name: &str, value: &Value) -> CaseResult<()> {
    let case = TestCase::from_json(name, value)?;
    debug!(case = name, network = %case.network, family = %case.environment.family(), "starting case");

    let params = chain_params(&case, context.chain_id, context.rewards.get(&case.network).copied());
    session
        .set_chain_params(&params)
        .await
        .map_err(|e| CaseError::session(session.endpoint(), e))?;

    let summary = run_blocks(
        session,
        &case.environment,
        &case.blocks,
        &case.exceptions,
        &context.taxonomy,
        context.options.allow_invalid_blocks,
    )
    .await?;
    debug!(case = name, imported = summary.imported, rejected = summary.rejected, "blocks replayed");

    validate_final_state(session, &case, context.options.exhaustive_state).await
}

/// Vector files under `path`, sorted; `path` itself when it is a file
pub fn collect_vector_files(path: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        collect_recursive(path, &mut files)?;
        files.sort();
    }
    Ok(files)
}

fn collect_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), RunnerError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    Ok(())
}
