//! Ingestion driver: one timed engine invocation per (revision, mode).

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use crate::engine::{Engine, Mode};
use crate::error::Result;
use crate::output::parse_counters;

/// Counters and timing of a single ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestMetrics {
    pub revision: String,
    pub mode: Mode,
    pub files_processed: u64,
    pub symbols_created: u64,
    pub edges_created: u64,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl IngestMetrics {
    /// Files per second; 0 when the run was too fast to measure.
    pub fn files_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.files_processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Ratio of full to incremental wall-clock time. Reported, never judged.
pub fn speedup(full: &IngestMetrics, incremental: &IngestMetrics) -> f64 {
    let incr = incremental.duration.as_secs_f64();
    if incr > 0.0 {
        full.duration.as_secs_f64() / incr
    } else {
        0.0
    }
}

pub struct IngestDriver<'a, E: ?Sized> {
    engine: &'a E,
    project: &'a Path,
}

impl<'a, E: Engine + ?Sized> IngestDriver<'a, E> {
    pub fn new(engine: &'a E, project: &'a Path) -> Self {
        Self { engine, project }
    }

    /// Ingest the current working tree into `store`.
    ///
    /// A non-zero engine exit aborts with the captured stderr; counters that
    /// cannot be found in the output are recorded as 0.
    pub fn run(&self, store: &Path, mode: Mode, revision: &str) -> Result<IngestMetrics> {
        let start = Instant::now();
        let output = self.engine.ingest(self.project, store, mode)?;
        let duration = start.elapsed();

        let counters = parse_counters(&output.combined());
        Ok(IngestMetrics {
            revision: revision.to_string(),
            mode,
            files_processed: counters.files_processed,
            symbols_created: counters.symbols_created,
            edges_created: counters.edges_created,
            duration,
        })
    }
}
