//! On-disk layout of a validation run.
//!
//! ```text
//! <root>/
//!   db_full.db/            store rebuilt by the engine at every revision
//!   db_incremental.db/     store carried forward across revisions
//!   snapshots/<label>/full/{nodes,edges}.json
//!   snapshots/<label>/incremental/{nodes,edges}.json
//!   report.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::Mode;
use crate::error::{Result, ValidateError};

const FULL_STORE: &str = "db_full.db";
const INCREMENTAL_STORE: &str = "db_incremental.db";
const SNAPSHOTS_DIR: &str = "snapshots";
const REPORT_FILE: &str = "report.json";
const EPHEMERAL_PREFIX: &str = "cg_validate_";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Use (and create if needed) a caller-supplied directory.
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| ValidateError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Fresh directory under the system temp dir. It is deliberately not
    /// removed afterwards: snapshots are the post-mortem record of the run.
    pub fn ephemeral() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(EPHEMERAL_PREFIX)
            .tempdir()
            .map_err(|e| ValidateError::io(std::env::temp_dir(), e))?;
        Ok(Self { root: dir.keep() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self, mode: Mode) -> PathBuf {
        match mode {
            Mode::Full => self.root.join(FULL_STORE),
            Mode::Incremental => self.root.join(INCREMENTAL_STORE),
        }
    }

    pub fn snapshots_root(&self) -> PathBuf {
        self.root.join(SNAPSHOTS_DIR)
    }

    pub fn snapshot_dir(&self, label: &str, mode: Mode) -> PathBuf {
        self.snapshots_root().join(label).join(mode.as_str())
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    /// Delete both stores. Called once per run, before the first revision.
    pub fn reset_stores(&self) -> Result<()> {
        for mode in [Mode::Full, Mode::Incremental] {
            remove_path(&self.store(mode))?;
        }
        Ok(())
    }
}

fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ValidateError::io(path, e)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| ValidateError::io(path, e))
}
