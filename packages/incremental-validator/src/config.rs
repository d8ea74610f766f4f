//! Run configuration assembled from the command line.

use std::path::PathBuf;

use crate::error::{Result, ValidateError};

/// Default location of the engine binary, relative to the invoking directory.
pub const DEFAULT_ENGINE: &str = "./target/release/cg";

/// Characters of each diff echoed to the console on failure.
pub const DEFAULT_DIFF_PREVIEW: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Working tree to validate against
    pub repo: PathBuf,
    /// Revisions in the order they are ingested
    pub revisions: Vec<String>,
    /// Ingestion engine executable
    pub engine: PathBuf,
    /// Workspace root; an ephemeral directory when absent
    pub workspace: Option<PathBuf>,
    pub diff_preview: usize,
}

impl ValidatorConfig {
    pub fn new(
        repo: impl Into<PathBuf>,
        revisions: Vec<String>,
        engine: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo: repo.into(),
            revisions,
            engine: engine.into(),
            workspace: None,
            diff_preview: DEFAULT_DIFF_PREVIEW,
        }
    }

    /// Fail early when the engine executable does not exist.
    pub fn check_engine(&self) -> Result<()> {
        if self.engine.is_file() {
            Ok(())
        } else {
            Err(ValidateError::EngineNotFound(self.engine.clone()))
        }
    }
}

/// Split `"HEAD~5, HEAD~3,HEAD"` into trimmed revision references.
pub fn parse_revision_list(list: &str) -> Result<Vec<String>> {
    let mut revisions = Vec::new();
    for (idx, raw) in list.split(',').enumerate() {
        let rev = raw.trim();
        if rev.is_empty() {
            return Err(ValidateError::InvalidRevisionList(format!(
                "entry {} of '{}' is empty",
                idx + 1,
                list
            )));
        }
        revisions.push(rev.to_string());
    }
    Ok(revisions)
}
