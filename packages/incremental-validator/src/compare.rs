//! Snapshot comparator.
//!
//! The verdict is deep equality of the parsed node and edge sequences. The
//! unified diff is a debugging artifact produced only on mismatch and never
//! feeds back into the verdict.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::process::{CommandRunner, CommandSpec};
use crate::snapshot::Snapshot;

/// Outcome of comparing a baseline snapshot against a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub nodes_match: bool,
    pub edges_match: bool,
    pub node_diff: Option<String>,
    pub edge_diff: Option<String>,
}

impl Comparison {
    pub fn matches(&self) -> bool {
        self.nodes_match && self.edges_match
    }
}

pub struct Comparator<R> {
    runner: R,
}

impl<R: CommandRunner> Comparator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn compare(&self, baseline: &Snapshot, candidate: &Snapshot) -> Result<Comparison> {
        let base = baseline.load()?;
        let cand = candidate.load()?;

        let nodes_match = base.nodes == cand.nodes;
        let edges_match = base.edges == cand.edges;

        Ok(Comparison {
            nodes_match,
            edges_match,
            node_diff: (!nodes_match).then(|| self.unified_diff(&baseline.nodes, &candidate.nodes)),
            edge_diff: (!edges_match).then(|| self.unified_diff(&baseline.edges, &candidate.edges)),
        })
    }

    /// `diff -u baseline candidate`, falling back to an in-process whole-file
    /// diff when the tool is missing, errors out, or prints nothing.
    pub fn unified_diff(&self, baseline: &Path, candidate: &Path) -> String {
        let spec = CommandSpec::new("diff")
            .arg("-u")
            .path_arg(baseline)
            .path_arg(candidate);

        match self.runner.run(&spec) {
            // diff exits 1 when the inputs differ
            Ok(out) if matches!(out.status, Some(0) | Some(1)) && !out.stdout.is_empty() => {
                out.stdout
            }
            Ok(out) => {
                tracing::warn!(
                    status = ?out.status,
                    stderr = %out.stderr.trim(),
                    "diff produced no usable output"
                );
                fallback_diff(baseline, candidate)
            }
            Err(e) => {
                tracing::warn!(error = %e, "diff unavailable, using built-in diff");
                fallback_diff(baseline, candidate)
            }
        }
    }
}

fn fallback_diff(baseline: &Path, candidate: &Path) -> String {
    let old = fs::read_to_string(baseline).unwrap_or_default();
    let new = fs::read_to_string(candidate).unwrap_or_default();
    whole_file_diff(
        &baseline.display().to_string(),
        &old,
        &candidate.display().to_string(),
        &new,
    )
}

/// Unified diff with a single hunk that trims the common prefix and suffix.
///
/// Not minimal, but always non-empty for differing inputs and readable by
/// `patch` and diff viewers.
pub fn whole_file_diff(old_label: &str, old: &str, new_label: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_lines.len().min(new_lines.len()) - prefix;
    let suffix = old_lines
        .iter()
        .rev()
        .zip(new_lines.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let removed = &old_lines[prefix..old_lines.len() - suffix];
    let added = &new_lines[prefix..new_lines.len() - suffix];

    let mut out = format!("--- {}\n+++ {}\n", old_label, new_label);
    out.push_str(&format!(
        "@@ -{} +{} @@\n",
        hunk_range(prefix, removed.len()),
        hunk_range(prefix, added.len())
    ));
    for line in removed {
        out.push('-');
        out.push_str(line);
        out.push('\n');
    }
    for line in added {
        out.push('+');
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn hunk_range(prefix: usize, len: usize) -> String {
    // Empty ranges name the line before the hunk, per the unified format.
    if len == 0 {
        format!("{},0", prefix)
    } else {
        format!("{},{}", prefix + 1, len)
    }
}
