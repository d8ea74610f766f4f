//! Validation orchestrator.
//!
//! ```text
//! Init ─► PreconditionChecked ─► Running(i) ─► Compared(i) ─┬► Running(i+1)
//!   │                                                       ├► HaltedOnMismatch ─┐
//!   └► Refused (dirty tree, nothing touched)                └► Completed ────────┴► Restored
//! ```
//!
//! Revisions are processed strictly in order on one shared working tree:
//! the incremental store must see the tree evolve in the same sequence a
//! real consumer would. Restoration of the original reference is tied to
//! [`WorkingTreeGuard`], so it happens on every exit path, including `?`
//! propagation and panics.

use crate::compare::Comparator;
use crate::engine::{Engine, Mode};
use crate::error::{Result, ValidateError};
use crate::ingest::IngestDriver;
use crate::process::CommandRunner;
use crate::report::{RunOutcome, ValidationResult};
use crate::repo::Repository;
use crate::snapshot::SnapshotExporter;
use crate::workspace::Workspace;

/// Number of dirty entries echoed when refusing to run.
const DIRTY_PREVIEW: usize = 5;

// ── WorkingTreeGuard ────────────────────────────────────────────────

/// Scoped ownership of a working tree that has been moved off its original
/// reference. Dropping the guard checks the original reference back out.
///
/// Prefer [`WorkingTreeGuard::release`] on the normal path: it reports a
/// failed restore as an error, whereas `Drop` can only log it.
pub struct WorkingTreeGuard<'a, R: Repository + ?Sized> {
    repo: &'a R,
    original: String,
    armed: bool,
}

impl<'a, R: Repository + ?Sized> WorkingTreeGuard<'a, R> {
    pub fn new(repo: &'a R, original: String) -> Self {
        Self { repo, original, armed: true }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn release(mut self) -> Result<()> {
        self.armed = false;
        restore(self.repo, &self.original)
    }
}

impl<R: Repository + ?Sized> Drop for WorkingTreeGuard<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = restore(self.repo, &self.original) {
            tracing::error!(error = %e, "working tree left off its original reference");
        }
    }
}

fn restore<R: Repository + ?Sized>(repo: &R, reference: &str) -> Result<()> {
    tracing::info!(reference, "restoring working tree");
    repo.checkout(reference).map_err(|e| ValidateError::Restore {
        reference: reference.to_string(),
        source: Box::new(e),
    })
}

// ── Validator ───────────────────────────────────────────────────────

pub struct Validator<R, E, D> {
    repo: R,
    engine: E,
    comparator: Comparator<D>,
    workspace: Workspace,
    diff_preview: usize,
}

impl<R: Repository, E: Engine, D: CommandRunner> Validator<R, E, D> {
    /// `diff_runner` executes the external `diff` used for mismatch artifacts.
    pub fn new(repo: R, engine: E, diff_runner: D, workspace: Workspace) -> Self {
        Self {
            repo,
            engine,
            comparator: Comparator::new(diff_runner),
            workspace,
            diff_preview: crate::config::DEFAULT_DIFF_PREVIEW,
        }
    }

    pub fn with_diff_preview(mut self, chars: usize) -> Self {
        self.diff_preview = chars;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Validate `revisions` in order.
    ///
    /// Every revision is resolved to a commit id before the tree is moved,
    /// so relative forms like `HEAD~3` name the commits they named when the
    /// run started.
    ///
    /// Returns `Refused` without touching the tree when it has uncommitted
    /// changes, `Halted` at the first mismatch, `Completed` otherwise. Fatal
    /// errors are returned after the original reference has been restored.
    pub fn run(&self, revisions: &[String]) -> Result<RunOutcome> {
        match self.repo.status_entries() {
            Ok(entries) if !entries.is_empty() => {
                report_dirty(&entries);
                return Ok(RunOutcome::Refused { entries });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("{}", unverified_status_message(&e));
            }
        }

        let original = self.repo.current_reference()?;
        let commits = self.resolve_all(revisions)?;
        self.workspace.reset_stores()?;
        tracing::info!(
            original = %original,
            workspace = %self.workspace.root().display(),
            revisions = revisions.len(),
            "starting validation"
        );

        let guard = WorkingTreeGuard::new(&self.repo, original);
        let outcome = self.validate_all(revisions, &commits);
        let restored = guard.release();

        match (outcome, restored) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(restore_err)) => Err(restore_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                tracing::error!(error = %restore_err, "restore failed after fatal error");
                Err(e)
            }
        }
    }

    fn resolve_all(&self, revisions: &[String]) -> Result<Vec<String>> {
        revisions
            .iter()
            .map(|revision| {
                let commit = self.repo.resolve(revision)?;
                tracing::debug!(revision = %revision, commit = %commit, "resolved");
                Ok(commit)
            })
            .collect()
    }

    fn validate_all(&self, revisions: &[String], commits: &[String]) -> Result<RunOutcome> {
        let mut results = Vec::with_capacity(revisions.len());

        for (idx, (revision, commit)) in revisions.iter().zip(commits).enumerate() {
            tracing::info!("revision {}/{}: {} ({})", idx + 1, revisions.len(), revision, commit);

            let result = self.validate_revision(revision, commit)?;
            let passed = result.passed();
            results.push(result);

            if !passed {
                if let Some(failed) = results.last() {
                    self.report_mismatch(failed);
                }
                return Ok(RunOutcome::Halted(results));
            }
        }

        Ok(RunOutcome::Completed(results))
    }

    /// Check out `commit`, ingest it in both modes, export and compare.
    /// `revision` is the name the caller asked for and is kept for reporting.
    pub fn validate_revision(&self, revision: &str, commit: &str) -> Result<ValidationResult> {
        self.repo.checkout(commit)?;
        let label = self.repo.short_name(commit)?;

        let driver = IngestDriver::new(&self.engine, self.repo.root());
        let exporter = SnapshotExporter::new(&self.engine);

        tracing::info!("[1/4] full ingestion");
        let full = driver.run(&self.workspace.store(Mode::Full), Mode::Full, commit)?;
        tracing::info!(
            files = full.files_processed,
            secs = full.duration.as_secs_f64(),
            "full ingestion done"
        );

        tracing::info!("[2/4] exporting full snapshot");
        let full_snapshot = exporter.export(
            &self.workspace.store(Mode::Full),
            &self.workspace.snapshot_dir(&label, Mode::Full),
        )?;

        tracing::info!("[3/4] incremental ingestion");
        let incremental =
            driver.run(&self.workspace.store(Mode::Incremental), Mode::Incremental, commit)?;
        tracing::info!(
            files = incremental.files_processed,
            secs = incremental.duration.as_secs_f64(),
            speedup = %format!("{:.1}x", crate::ingest::speedup(&full, &incremental)),
            "incremental ingestion done"
        );

        tracing::info!("[4/4] exporting incremental snapshot");
        let incremental_snapshot = exporter.export(
            &self.workspace.store(Mode::Incremental),
            &self.workspace.snapshot_dir(&label, Mode::Incremental),
        )?;

        let comparison = self.comparator.compare(&full_snapshot, &incremental_snapshot)?;
        if comparison.matches() {
            tracing::info!(revision, "PASS: snapshots match");
        } else {
            tracing::warn!(
                revision,
                nodes_match = comparison.nodes_match,
                edges_match = comparison.edges_match,
                "FAIL: snapshots differ"
            );
        }

        Ok(ValidationResult::new(revision, commit, &label, comparison, full, incremental))
    }

    fn report_mismatch(&self, result: &ValidationResult) {
        tracing::error!(
            revision = %result.revision,
            artifacts = %self.workspace.snapshots_root().display(),
            "validation failed, remaining revisions skipped"
        );
        if let Some(diff) = &result.node_diff {
            tracing::error!("node diff:\n{}", preview(diff, self.diff_preview));
        }
        if let Some(diff) = &result.edge_diff {
            tracing::error!("edge diff:\n{}", preview(diff, self.diff_preview));
        }
    }
}

fn report_dirty(entries: &[String]) {
    let mut listing: Vec<String> =
        entries.iter().take(DIRTY_PREVIEW).map(|e| format!("  {}", e)).collect();
    if entries.len() > DIRTY_PREVIEW {
        listing.push(format!("  ... and {} more", entries.len() - DIRTY_PREVIEW));
    }
    tracing::error!(
        "repository has uncommitted changes; validation checks out other revisions.\n{}\n\
         Commit or stash them first:\n  git stash\n  # or\n  git commit -am 'WIP'",
        listing.join("\n")
    );
}

fn unverified_status_message(error: &ValidateError) -> String {
    format!(
        "could not check working tree status ({}); continuing as if clean. \
         The tree may have uncommitted changes, and checking out revisions \
         can overwrite them",
        error
    )
}

/// First `chars` characters of `text`, marking the cut.
pub fn preview(text: &str, chars: usize) -> String {
    match text.char_indices().nth(chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
