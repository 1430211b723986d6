//! Install error types.

use thiserror::Error;

/// Errors that end a formula install.
///
/// Nothing is retried or rolled back: the first error is returned as is.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Mandatory dependencies were absent. Raised before any step runs.
    #[error("{formula}: missing dependencies: {}", missing.join(", "))]
    DependencyMissing {
        formula: String,
        missing: Vec<String>,
    },

    /// A step exited non-zero or was killed by a signal (`code` is None).
    #[error("step {} failed: {command} (exit code: {code:?})", index + 1)]
    StepFailed {
        /// Zero-based position in the install sequence.
        index: usize,
        command: String,
        code: Option<i32>,
        /// Captured stdout followed by stderr.
        output: String,
    },

    /// The shell for a step could not be started.
    #[error("step {} could not start: {command}: {source}", index + 1)]
    Spawn {
        index: usize,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Exit status the failing command returned, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildError::StepFailed { code, .. } => *code,
            _ => None,
        }
    }

    /// Zero-based index of the step that failed, if a step failed.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            BuildError::StepFailed { index, .. } | BuildError::Spawn { index, .. } => Some(*index),
            _ => None,
        }
    }
}
