//! Shared fixtures: a throwaway git repository and a shell-script engine.
//!
//! The fake engine copies `graph/nodes.json` and `graph/edges.json` from the
//! project tree into the store on `ingest`, preferring
//! `graph/nodes.incremental.json` in incremental mode so a test can make the
//! two modes diverge at a chosen commit. `query` prints a banner line and
//! then the stored array.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;

/// Tests in one binary share this lock so no thread forks while another has
/// the engine script open for writing (which would make exec fail with
/// "Text file busy").
static SERIAL: Mutex<()> = Mutex::new(());

pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

const ENGINE_SCRIPT: &str = r#"#!/bin/sh
set -e
cmd="$1"; shift
case "$cmd" in
  ingest)
    project=""; db=""; mode=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --project) project="$2"; shift 2 ;;
        --db) db="$2"; shift 2 ;;
        --clean) mode=full; shift ;;
        --incremental) mode=incremental; shift ;;
        *) shift ;;
      esac
    done
    mkdir -p "$db"
    nodes="$project/graph/nodes.json"
    if [ "$mode" = incremental ] && [ -f "$project/graph/nodes.incremental.json" ]; then
      nodes="$project/graph/nodes.incremental.json"
    fi
    cp "$nodes" "$db/nodes.json"
    cp "$project/graph/edges.json" "$db/edges.json"
    echo "Ingestion complete!"
    echo "  Files processed: 2"
    echo "  Symbols created: 5"
    echo "  Edges created: 1" >&2
    ;;
  query)
    q="$1"; shift
    db=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --db) db="$2"; shift 2 ;;
        *) shift ;;
      esac
    done
    echo "cg 0.1.0 - opening $db"
    case "$q" in
      *"(n:Node)"*) cat "$db/nodes.json" ;;
      *) cat "$db/edges.json" ;;
    esac
    ;;
  *)
    echo "unknown command: $cmd" >&2
    exit 2
    ;;
esac
"#;

pub fn write_engine(dir: &Path) -> PathBuf {
    let path = dir.join("cg");
    fs::write(&path, ENGINE_SCRIPT).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

pub fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Validator Test", "-c", "user.email=validator@test.invalid"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(repo)
        .output()
        .unwrap_or_else(|e| panic!("git {} failed: {}", args.join(" "), e));
    assert!(
        output.status.success(),
        "git {} failed:\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn node(id: u64, name: &str) -> serde_json::Value {
    serde_json::json!({"n.id": id, "n.node_type": "function", "n.name": name, "n.file": "a.py"})
}

/// Git repository on branch `main` with no commits yet.
pub fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    dir
}

/// Commit a graph fixture and return the full commit hash.
pub fn commit_graph(
    repo: &Path,
    nodes: &[serde_json::Value],
    incremental_nodes: Option<&[serde_json::Value]>,
    message: &str,
) -> String {
    let graph = repo.join("graph");
    fs::create_dir_all(&graph).unwrap();
    fs::write(graph.join("nodes.json"), serde_json::to_string(nodes).unwrap()).unwrap();
    fs::write(graph.join("edges.json"), "[]").unwrap();
    let incremental = graph.join("nodes.incremental.json");
    match incremental_nodes {
        Some(nodes) => fs::write(&incremental, serde_json::to_string(nodes).unwrap()).unwrap(),
        None => {
            if incremental.exists() {
                fs::remove_file(&incremental).unwrap();
            }
        }
    }
    git(repo, &["add", "-A"]);
    git(repo, &["commit", "-q", "-m", message]);
    git(repo, &["rev-parse", "HEAD"])
}
