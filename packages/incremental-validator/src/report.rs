//! Per-revision results and the end-of-run summary.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::compare::Comparison;
use crate::error::{Result, ValidateError};
use crate::ingest::{speedup, IngestMetrics};

/// Verdict for one revision. Created once both snapshots exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Revision as requested, e.g. `HEAD~3`
    pub revision: String,
    /// Commit id the revision resolved to when the run started
    pub commit: String,
    /// Short label the snapshots were stored under
    pub label: String,
    pub nodes_match: bool,
    pub edges_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_diff: Option<String>,
    pub full: IngestMetrics,
    pub incremental: IngestMetrics,
}

impl ValidationResult {
    pub fn new(
        revision: &str,
        commit: &str,
        label: &str,
        comparison: Comparison,
        full: IngestMetrics,
        incremental: IngestMetrics,
    ) -> Self {
        Self {
            revision: revision.to_string(),
            commit: commit.to_string(),
            label: label.to_string(),
            nodes_match: comparison.nodes_match,
            edges_match: comparison.edges_match,
            node_diff: comparison.node_diff,
            edge_diff: comparison.edge_diff,
            full,
            incremental,
        }
    }

    pub fn passed(&self) -> bool {
        self.nodes_match && self.edges_match
    }

    pub fn speedup(&self) -> f64 {
        speedup(&self.full, &self.incremental)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every requested revision was validated and matched.
    Completed(Vec<ValidationResult>),
    /// Stopped at the first mismatch; the last result is the failing one.
    Halted(Vec<ValidationResult>),
    /// The working tree was dirty; nothing was checked out.
    Refused { entries: Vec<String> },
}

impl RunOutcome {
    pub fn results(&self) -> &[ValidationResult] {
        match self {
            RunOutcome::Completed(results) | RunOutcome::Halted(results) => results,
            RunOutcome::Refused { .. } => &[],
        }
    }

    pub fn summary(&self) -> Summary<'_> {
        Summary::new(self.results(), matches!(self, RunOutcome::Refused { .. }))
    }
}

/// Aggregate view printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary<'a> {
    pub tested: usize,
    pub passed: usize,
    pub failed: usize,
    pub refused: bool,
    pub results: &'a [ValidationResult],
}

impl<'a> Summary<'a> {
    pub fn new(results: &'a [ValidationResult], refused: bool) -> Self {
        let passed = results.iter().filter(|r| r.passed()).count();
        Self {
            tested: results.len(),
            passed,
            failed: results.len() - passed,
            refused,
            results,
        }
    }

    pub fn success(&self) -> bool {
        !self.refused && self.failed == 0
    }

    /// Process exit code: 0 only when every tested revision matched.
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| ValidateError::io(path, e))
    }
}

fn short(revision: &str) -> &str {
    match revision.char_indices().nth(7) {
        Some((idx, _)) => &revision[..idx],
        None => revision,
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(80);
        writeln!(f, "{}", rule)?;
        writeln!(f, "VALIDATION SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;
        writeln!(f, "Total revisions tested: {}", self.tested)?;
        writeln!(f, "Passed: {}", self.passed)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f)?;

        writeln!(f, "Performance Metrics:")?;
        writeln!(
            f,
            "{:<12} {:<12} {:<8} {:<12} {:<10} {:<8}",
            "Revision", "Mode", "Files", "Duration", "Files/sec", "Speedup"
        )?;
        writeln!(f, "{}", "-".repeat(80))?;
        for result in self.results {
            for metrics in [&result.full, &result.incremental] {
                let speedup = match metrics.mode {
                    crate::engine::Mode::Full => String::new(),
                    crate::engine::Mode::Incremental => format!("{:.1}x", result.speedup()),
                };
                writeln!(
                    f,
                    "{:<12} {:<12} {:<8} {:<12.2} {:<10.1} {:<8}",
                    short(&metrics.revision),
                    metrics.mode.as_str(),
                    metrics.files_processed,
                    metrics.duration.as_secs_f64(),
                    metrics.files_per_sec(),
                    speedup
                )?;
            }
        }
        writeln!(f)?;

        if self.refused {
            write!(f, "VALIDATION REFUSED (uncommitted changes)")
        } else if self.success() {
            write!(f, "ALL VALIDATIONS PASSED")
        } else {
            write!(f, "VALIDATION FAILED")
        }
    }
}
