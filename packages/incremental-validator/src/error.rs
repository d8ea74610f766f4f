//! Error types for the validation harness

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidateError>;

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` exited with {}:\n{stderr}", exit_label(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Engine output could not be interpreted. `raw` holds everything the
    /// engine printed so the regression can be triaged from the log alone.
    #[error("Malformed engine output ({reason}):\n{raw}")]
    MalformedOutput { reason: String, raw: String },

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine executable not found at {}", .0.display())]
    EngineNotFound(PathBuf),

    #[error("Invalid revision list: {0}")]
    InvalidRevisionList(String),

    #[error("Failed to restore working tree to '{reference}': {source}")]
    Restore {
        reference: String,
        #[source]
        source: Box<ValidateError>,
    },
}

fn exit_label(status: &Option<i32>) -> String {
    match *status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl ValidateError {
    /// Helper for wrapping filesystem errors with the offending path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ValidateError::Io { path: path.into(), source }
    }

    /// Stable identifier used in `report.json` and log lines
    pub fn code(&self) -> &'static str {
        match self {
            ValidateError::Spawn { .. } => "SPAWN_FAILED",
            ValidateError::CommandFailed { .. } => "COMMAND_FAILED",
            ValidateError::MalformedOutput { .. } => "MALFORMED_OUTPUT",
            ValidateError::Io { .. } => "IO_ERROR",
            ValidateError::Json(_) => "JSON_ERROR",
            ValidateError::EngineNotFound(_) => "ENGINE_NOT_FOUND",
            ValidateError::InvalidRevisionList(_) => "INVALID_REVISION_LIST",
            ValidateError::Restore { .. } => "RESTORE_FAILED",
        }
    }
}
