//! Invocation contract of the external ingestion engine.
//!
//! The engine is a black box reached via two subcommands:
//!
//! ```text
//! <engine> ingest --project <tree> --db <store> (--clean | --incremental)
//! <engine> query "<query text>" --db <store> --json
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::process::{run_checked, CommandOutput, CommandRunner, CommandSpec};

/// Environment applied to `query` so the structured array is not buried in
/// colour escapes or info-level log lines.
pub const QUERY_ENV: [(&str, &str); 2] = [("NO_COLOR", "1"), ("RUST_LOG", "error")];

/// Ingestion mode selected by flag on every `ingest` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Rebuild the store from scratch
    Full,
    /// Apply only the delta since the store's last ingested state
    Incremental,
}

impl Mode {
    pub fn flag(&self) -> &'static str {
        match self {
            Mode::Full => "--clean",
            Mode::Incremental => "--incremental",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Full => "full",
            Mode::Incremental => "incremental",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the harness needs from an ingestion engine.
///
/// Both calls block until the engine exits. A non-zero exit is returned as
/// an error; on success the captured output is handed back for scraping.
pub trait Engine {
    fn ingest(&self, project: &Path, store: &Path, mode: Mode) -> Result<CommandOutput>;

    fn query(&self, store: &Path, query: &str) -> Result<CommandOutput>;
}

/// [`Engine`] backed by an executable on disk.
pub struct CliEngine<R> {
    binary: PathBuf,
    runner: R,
}

impl<R: CommandRunner> CliEngine<R> {
    pub fn new(binary: impl Into<PathBuf>, runner: R) -> Self {
        Self { binary: binary.into(), runner }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.binary.to_string_lossy().into_owned())
    }

    pub fn ingest_command(&self, project: &Path, store: &Path, mode: Mode) -> CommandSpec {
        self.command()
            .arg("ingest")
            .arg("--project")
            .path_arg(project)
            .arg("--db")
            .path_arg(store)
            .arg(mode.flag())
    }

    pub fn query_command(&self, store: &Path, query: &str) -> CommandSpec {
        let mut spec = self
            .command()
            .arg("query")
            .arg(query)
            .arg("--db")
            .path_arg(store)
            .arg("--json");
        for (key, value) in QUERY_ENV {
            spec = spec.env(key, value);
        }
        spec
    }
}

impl<R: CommandRunner> Engine for CliEngine<R> {
    fn ingest(&self, project: &Path, store: &Path, mode: Mode) -> Result<CommandOutput> {
        run_checked(&self.runner, &self.ingest_command(project, store, mode))
    }

    fn query(&self, store: &Path, query: &str) -> Result<CommandOutput> {
        run_checked(&self.runner, &self.query_command(store, query))
    }
}
