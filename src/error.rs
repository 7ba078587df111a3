use std::io;
use thiserror::Error;

/// Errors raised while loading, validating, or solving a linear system.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Input file path given but the file cannot be opened or read
    #[error("cannot read linear system from '{path}'")]
    InputNotFound {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Input file contents disagree with the declared system size
    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    /// Zero diagonal entry; SOR cannot divide by the pivot
    #[error("zero pivot on row {row}")]
    SingularPivot { row: usize },

    /// Output file path cannot be created or written
    #[error("cannot write solution to '{path}'")]
    OutputWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Configuration rejected before the solve starts
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A peer worker went away while the protocol still needed it
    #[error("worker {worker} disconnected mid-solve")]
    Disconnected { worker: usize },

    /// A message arrived that the sweep schedule cannot have produced
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}
