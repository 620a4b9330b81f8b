use std::time::Duration;

use thiserror::Error;

/// Failure of a single external query
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{program} not found")]
    NotFound { program: String },

    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("{program} failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed output: {0}")]
    Json(#[from] serde_json::Error),
}
