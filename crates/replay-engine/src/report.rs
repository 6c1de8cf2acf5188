//! Case, file and run reports

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::{CaseError, OutcomeKind};

/// Result of one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    /// Test name
    pub name: String,
    /// Outcome category
    pub outcome: OutcomeKind,
    /// Failure, error or skip reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Endpoint the case ran on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl CaseReport {
    /// Report for a case that ran
    pub fn finished(name: impl Into<String>, endpoint: &str, result: Result<(), CaseError>, elapsed: Duration) -> Self {
        let (outcome, message) = match result {
            Ok(()) => (OutcomeKind::Pass, None),
            Err(e) => (e.kind(), Some(e.to_string())),
        };
        Self {
            name: name.into(),
            outcome,
            message,
            endpoint: Some(endpoint.to_string()),
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Report for a case that was not run
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: OutcomeKind::Skipped,
            message: Some(reason.into()),
            endpoint: None,
            duration_ms: 0,
        }
    }

    /// Report for a case that should have run but never got a result
    pub fn lost(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            outcome: OutcomeKind::Error,
            ..Self::skipped(name, reason)
        }
    }

    /// True for outcomes that count against the run
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, OutcomeKind::Fail | OutcomeKind::Unmapped | OutcomeKind::Error)
    }
}

/// Results of one vector file, cases in file order
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileReport {
    /// File path or vector name
    pub source: String,
    /// Per-case results
    pub cases: Vec<CaseReport>,
    /// File-level problem that kept every case from running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the run was cancelled while this file was running
    pub cancelled: bool,
    /// True when the file stopped early after a failure
    pub stopped: bool,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl FileReport {
    /// Report for a file that could not be loaded
    pub fn unreadable(source: impl Into<String>, error: impl ToString) -> Self {
        Self {
            source: source.into(),
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// Case result by name
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// Counts for this file
    pub fn stats(&self) -> TestStats {
        let mut stats = TestStats::new();
        stats.add_file(self);
        stats
    }
}

/// Aggregated test statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestStats {
    /// Cases seen
    pub total: usize,
    /// Cases passed
    pub passed: usize,
    /// Cases failed
    pub failed: usize,
    /// Cases whose expected exception has no table entry
    pub unmapped: usize,
    /// Cases that could not be run
    pub errors: usize,
    /// Cases filtered out or unsupported
    pub skipped: usize,
    /// Files that could not be loaded
    pub file_errors: usize,
    /// Total execution time
    #[serde(skip)]
    pub duration: Duration,
    /// Failed case names with reasons
    pub failures: Vec<(String, String)>,
}

impl TestStats {
    /// Create empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file's results
    pub fn add_file(&mut self, file: &FileReport) {
        if let Some(error) = &file.error {
            self.file_errors += 1;
            self.failures.push((file.source.clone(), error.clone()));
        }
        for case in &file.cases {
            self.total += 1;
            match case.outcome {
                OutcomeKind::Pass => self.passed += 1,
                OutcomeKind::Fail => self.failed += 1,
                OutcomeKind::Unmapped => self.unmapped += 1,
                OutcomeKind::Error => self.errors += 1,
                OutcomeKind::Skipped => self.skipped += 1,
            }
            if case.is_failure() {
                let reason = case.message.clone().unwrap_or_default();
                self.failures.push((case.name.clone(), reason));
            }
        }
    }

    /// Pass rate over cases that ran, as a percentage
    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed + self.failed + self.unmapped + self.errors;
        if executed == 0 {
            return 100.0;
        }
        (self.passed as f64 / executed as f64) * 100.0
    }

    /// True when nothing failed
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unmapped == 0 && self.errors == 0 && self.file_errors == 0
    }
}

impl fmt::Display for TestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========================================")?;
        writeln!(f, "Test Summary")?;
        writeln!(f, "========================================")?;
        writeln!(f, "Total:    {}", self.total)?;
        writeln!(f, "Passed:   {}", self.passed)?;
        writeln!(f, "Failed:   {}", self.failed)?;
        writeln!(f, "Unmapped: {}", self.unmapped)?;
        writeln!(f, "Errors:   {}", self.errors)?;
        writeln!(f, "Skipped:  {}", self.skipped)?;
        if self.file_errors > 0 {
            writeln!(f, "Unreadable files: {}", self.file_errors)?;
        }
        writeln!(f, "Pass Rate: {:.2}%", self.pass_rate())?;
        write!(f, "Duration: {:.2}s", self.duration.as_secs_f64())?;

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "\nFailed tests:")?;
            for (name, reason) in &self.failures {
                writeln!(f, "  - {}: {}", name, reason)?;
            }
        }
        Ok(())
    }
}

/// Results of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Per-file reports in the order the files were run
    pub files: Vec<FileReport>,
    /// Totals over every file
    pub stats: TestStats,
    /// True when the run was cancelled
    pub cancelled: bool,
}

impl RunSummary {
    /// Fold a file into the totals
    pub fn push(&mut self, file: FileReport) {
        self.stats.add_file(&file);
        self.cancelled |= file.cancelled;
        self.files.push(file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> FileReport {
        FileReport {
            source: "suite.json".into(),
            cases: vec![
                CaseReport::finished("a", "mock", Ok(()), Duration::from_millis(5)),
                CaseReport::finished("b", "mock", Err(CaseError::Cancelled), Duration::ZERO),
                CaseReport::skipped("c", "network 'Osaka' not supported"),
            ],
            ..FileReport::default()
        }
    }

    #[test]
    fn test_stats_counts() {
        let stats = file().stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failures, vec![("b".to_string(), "cancelled".to_string())]);
        assert!(!stats.is_success());
        assert_eq!(stats.pass_rate(), 50.0);
    }

    #[test]
    fn test_unreadable_file_counts_as_failure() {
        let mut summary = RunSummary::default();
        summary.push(FileReport::unreadable("broken.json", "JSON error"));
        assert_eq!(summary.stats.file_errors, 1);
        assert!(!summary.stats.is_success());
    }

    #[test]
    fn test_summary_rendering() {
        let rendered = file().stats().to_string();
        assert!(rendered.contains("Passed:   1"));
        assert!(rendered.contains("  - b: cancelled"));
    }
}
