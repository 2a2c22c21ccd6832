use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while executing an external tool.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("execution of '{program}' was cancelled")]
    Cancelled { program: String },

    #[error("failed to grant execute permission on {path}: {source}")]
    Permission {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Whether this error represents cooperative cancellation rather than a
    /// fault.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
