//! Snapshot exporter: canonical, deterministically ordered dumps of a store.
//!
//! A snapshot is a directory holding `nodes.json` and `edges.json`. Both are
//! written only after both queries have succeeded, so a snapshot on disk is
//! never half of a store. Artifacts use sorted object keys and two-space
//! indentation, which makes two logically equal snapshots byte-identical.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::engine::Engine;
use crate::error::{Result, ValidateError};
use crate::output::extract_json_array;

/// All nodes, projected and ordered by id.
pub const NODES_QUERY: &str =
    "MATCH (n:Node) RETURN n.id, n.node_type, n.name, n.file ORDER BY n.id";

/// All edges, projected and ordered by (source, type, target).
pub const EDGES_QUERY: &str =
    "MATCH (a)-[e:EDGE]->(b) RETURN a.id, e.edge_type, b.id ORDER BY a.id, e.edge_type, b.id";

pub const NODES_FILE: &str = "nodes.json";
pub const EDGES_FILE: &str = "edges.json";

/// Paths of one exported snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub dir: PathBuf,
    pub nodes: PathBuf,
    pub edges: PathBuf,
}

/// Parsed contents of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotData {
    pub nodes: Vec<Value>,
    pub edges: Vec<Value>,
}

impl Snapshot {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            nodes: dir.join(NODES_FILE),
            edges: dir.join(EDGES_FILE),
            dir,
        }
    }

    pub fn load(&self) -> Result<SnapshotData> {
        Ok(SnapshotData {
            nodes: read_records(&self.nodes)?,
            edges: read_records(&self.edges)?,
        })
    }
}

pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path).map_err(|e| ValidateError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Canonical artifact text: sorted keys, two-space indent, trailing newline.
///
/// `serde_json::Map` is ordered by key unless the `preserve_order` feature is
/// enabled, which this crate does not do.
pub fn canonical_json(records: &[Value]) -> Result<String> {
    let mut text = serde_json::to_string_pretty(records)?;
    text.push('\n');
    Ok(text)
}

pub struct SnapshotExporter<'a, E: ?Sized> {
    engine: &'a E,
}

impl<'a, E: Engine + ?Sized> SnapshotExporter<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Query the complete node and edge sets of `store` and persist them
    /// under `out_dir`.
    pub fn export(&self, store: &Path, out_dir: &Path) -> Result<Snapshot> {
        let nodes = self.query_records(store, NODES_QUERY)?;
        let edges = self.query_records(store, EDGES_QUERY)?;

        let snapshot = Snapshot::at(out_dir);
        fs::create_dir_all(out_dir).map_err(|e| ValidateError::io(out_dir, e))?;
        write_artifact(&snapshot.nodes, &nodes)?;
        write_artifact(&snapshot.edges, &edges)?;

        tracing::debug!(
            dir = %out_dir.display(),
            nodes = nodes.len(),
            edges = edges.len(),
            "snapshot exported"
        );
        Ok(snapshot)
    }

    fn query_records(&self, store: &Path, query: &str) -> Result<Vec<Value>> {
        let output = self.engine.query(store, query)?;
        extract_json_array(&output.stdout, &output.stderr)
    }
}

fn write_artifact(path: &Path, records: &[Value]) -> Result<()> {
    let text = canonical_json(records)?;
    fs::write(path, text).map_err(|e| ValidateError::io(path, e))
}
