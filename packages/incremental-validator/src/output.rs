//! Parsers for the engine's textual output.
//!
//! Two things are scraped from engine output: labeled ingestion counters
//! (`"Files processed: 12"`) and the JSON array printed by `query --json`.
//! Both live here so the rest of the harness never depends on the exact
//! text layout, and so the boundary can be tested with crafted strings.

use serde_json::Value;

use crate::error::{Result, ValidateError};

pub const FILES_PROCESSED: &str = "Files processed";
pub const SYMBOLS_CREATED: &str = "Symbols created";
pub const EDGES_CREATED: &str = "Edges created";

/// Counters reported by one `ingest` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounters {
    pub files_processed: u64,
    pub symbols_created: u64,
    pub edges_created: u64,
}

/// Scrape ingestion counters from engine output.
///
/// Counters are diagnostic only: a missing label leaves its counter at 0 and
/// an unparseable value is logged and also treated as 0. The last occurrence
/// of a label wins.
pub fn parse_counters(text: &str) -> IngestCounters {
    let mut counters = IngestCounters::default();
    for line in text.lines() {
        if let Some(v) = labeled_value(line, FILES_PROCESSED) {
            counters.files_processed = v;
        } else if let Some(v) = labeled_value(line, SYMBOLS_CREATED) {
            counters.symbols_created = v;
        } else if let Some(v) = labeled_value(line, EDGES_CREATED) {
            counters.edges_created = v;
        }
    }
    counters
}

/// Value of `"<label>: <integer>"` anywhere in `line`.
///
/// Returns `Some(0)` when the label is present but the value is not a
/// non-negative integer, `None` when the label is absent.
fn labeled_value(line: &str, label: &str) -> Option<u64> {
    let start = line.find(label)?;
    let rest = line[start + label.len()..].trim_start();
    let rest = rest.strip_prefix(':')?;
    let token = rest.split_whitespace().next().unwrap_or("");
    match token.parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(label, line, "unparseable counter, defaulting to 0");
            Some(0)
        }
    }
}

/// Locate and parse the JSON array in `query --json` output.
///
/// The array starts at a `[` that opens a line (indentation allowed).
/// Banner lines may also open with `[`, as in `[INFO] opening db`; a
/// candidate that fails to parse on its own first line is skipped as banner
/// text. A candidate that gets past its first line, or runs out of input,
/// is the array and it is broken: that is reported rather than retried at a
/// later bracket. Trailing output after the array is ignored. Errors carry
/// the complete raw output.
pub fn extract_json_array(stdout: &str, stderr: &str) -> Result<Vec<Value>> {
    let malformed = |reason: String| ValidateError::MalformedOutput {
        reason,
        raw: format!("{}\n{}", stdout, stderr),
    };

    for offset in line_start_brackets(stdout) {
        let mut values =
            serde_json::Deserializer::from_str(&stdout[offset..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Array(items))) => return Ok(items),
            Some(Err(e)) if e.is_eof() || e.line() > 1 => {
                return Err(malformed(format!("truncated or malformed JSON array: {}", e)));
            }
            _ => {}
        }
    }

    Err(malformed("no JSON array found in query output".to_string()))
}

/// Byte offsets of every `[` that is the first non-blank character of a line.
fn line_start_brackets(text: &str) -> impl Iterator<Item = usize> + '_ {
    let mut line_start = 0;
    text.split_inclusive('\n').filter_map(move |line| {
        let start = line_start;
        line_start += line.len();
        let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
        line[indent..].starts_with('[').then_some(start + indent)
    })
}
