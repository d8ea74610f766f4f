//! Differential validation of incremental graph ingestion.
//!
//! For each revision in an ordered list, the working tree is checked out and
//! ingested twice: once into a store rebuilt from scratch (`--clean`) and
//! once into a store that carries its state forward across revisions
//! (`--incremental`). Both stores are exported as canonical snapshots and
//! compared structurally. The run stops at the first divergence and always
//! puts the working tree back where it found it.

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod output;
pub mod process;
pub mod report;
pub mod repo;
pub mod snapshot;
pub mod validator;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use compare::{Comparator, Comparison};
pub use config::{parse_revision_list, ValidatorConfig};
pub use engine::{CliEngine, Engine, Mode};
pub use error::{Result, ValidateError};
pub use ingest::{IngestDriver, IngestMetrics};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use report::{RunOutcome, Summary, ValidationResult};
pub use repo::{GitRepository, Repository};
pub use snapshot::{Snapshot, SnapshotExporter};
pub use validator::{Validator, WorkingTreeGuard};
pub use workspace::Workspace;

/// Wire the production collaborators together for `config`.
pub fn system_validator(
    config: &ValidatorConfig,
) -> Result<Validator<GitRepository<SystemRunner>, CliEngine<SystemRunner>, SystemRunner>> {
    let workspace = match &config.workspace {
        Some(dir) => Workspace::at(dir)?,
        None => Workspace::ephemeral()?,
    };
    let repo_root = config
        .repo
        .canonicalize()
        .map_err(|e| ValidateError::io(&config.repo, e))?;
    let engine = config
        .engine
        .canonicalize()
        .map_err(|_| ValidateError::EngineNotFound(config.engine.clone()))?;

    Ok(Validator::new(
        GitRepository::new(repo_root, SystemRunner),
        CliEngine::new(engine, SystemRunner),
        SystemRunner,
        workspace,
    )
    .with_diff_preview(config.diff_preview))
}
