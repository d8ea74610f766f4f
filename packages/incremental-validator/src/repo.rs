//! Repository controller: the working tree the engine ingests from.
//!
//! The harness mutates exactly one shared resource, the checked-out working
//! tree. Everything it needs from version control goes through
//! [`Repository`]; [`GitRepository`] is the production implementation.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::process::{run_checked, CommandRunner, CommandSpec};

pub trait Repository {
    /// Root of the working tree, passed to the engine as `--project`.
    fn root(&self) -> &Path;

    /// Uncommitted modifications, one porcelain status line each.
    fn status_entries(&self) -> Result<Vec<String>>;

    /// Whether the working tree has no uncommitted modifications.
    fn is_clean(&self) -> Result<bool> {
        Ok(self.status_entries()?.is_empty())
    }

    /// Stable identifier of the current checkout. Detached heads resolve to
    /// the exact revision id so restoring never lands on a moved branch.
    fn current_reference(&self) -> Result<String>;

    /// Full commit id `reference` names right now. Relative forms such as
    /// `HEAD~2` are only meaningful before the tree is moved.
    fn resolve(&self, reference: &str) -> Result<String>;

    fn checkout(&self, reference: &str) -> Result<()>;

    /// Short, collision-resistant label used for snapshot directory names.
    fn short_name(&self, reference: &str) -> Result<String>;
}

/// [`Repository`] driven through the `git` command line.
pub struct GitRepository<R> {
    root: PathBuf,
    runner: R,
}

impl<R: CommandRunner> GitRepository<R> {
    pub fn new(root: impl Into<PathBuf>, runner: R) -> Self {
        Self { root: root.into(), runner }
    }

    fn git(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new("git")
            .args(args.iter().copied())
            .current_dir(&self.root)
    }

    fn git_stdout(&self, args: &[&str]) -> Result<String> {
        let output = run_checked(&self.runner, &self.git(args))?;
        Ok(output.stdout.trim().to_string())
    }
}

impl<R: CommandRunner> Repository for GitRepository<R> {
    fn root(&self) -> &Path {
        &self.root
    }

    fn status_entries(&self) -> Result<Vec<String>> {
        // Porcelain lines start with a two-column status; keep them intact.
        let output = run_checked(&self.runner, &self.git(&["status", "--porcelain"]))?;
        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn current_reference(&self) -> Result<String> {
        let symbolic = self.git_stdout(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if symbolic == "HEAD" {
            return self.git_stdout(&["rev-parse", "HEAD"]);
        }
        Ok(symbolic)
    }

    fn resolve(&self, reference: &str) -> Result<String> {
        let target = format!("{}^{{commit}}", reference);
        self.git_stdout(&["rev-parse", "--verify", &target])
    }

    fn checkout(&self, reference: &str) -> Result<()> {
        tracing::debug!(reference, "checkout");
        run_checked(&self.runner, &self.git(&["checkout", reference]))?;
        Ok(())
    }

    fn short_name(&self, reference: &str) -> Result<String> {
        self.git_stdout(&["rev-parse", "--short", reference])
    }
}
