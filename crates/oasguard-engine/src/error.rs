use camino::Utf8PathBuf;
use oasguard_checksum::ChecksumError;
use oasguard_fetch::DownloadError;
use oasguard_install::InstallError;
use oasguard_runner::RunnerError;
use thiserror::Error;

/// Configuration problems, detected before any network or process work.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown operating mode '{0}' (expected 'generate' or 'validate')")]
    UnknownMode(String),

    #[error("unknown ruleset profile '{0}' (expected 'backend' or 'frontend')")]
    UnknownProfile(String),

    #[error(
        "document names and baseline paths must pair up: \
         got {documents} document name(s) and {baselines} baseline path(s)"
    )]
    MismatchedInputs { documents: usize, baselines: usize },
}

/// Errors raised while driving the orchestration pipeline.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("download failed: {0}")]
    Download(DownloadError),

    #[error("installation failed: {0}")]
    Install(InstallError),

    #[error("process execution failed: {0}")]
    Runner(RunnerError),

    #[error("checksum store failure: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("ruleset error: {details}")]
    Ruleset { details: String },

    #[error("{tool} did not produce expected output file {path}")]
    MissingToolOutput { tool: String, path: Utf8PathBuf },

    #[error("{tool} failed for document '{document}': {details}")]
    ToolFailed {
        tool: String,
        document: String,
        details: String,
    },

    #[error("spec generation for '{document}' timed out after {seconds}s")]
    SpecGenTimeout { document: String, seconds: u64 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Whether this error stems from cooperative cancellation rather than a
    /// fault.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// Cancellation signals from lower layers collapse into `Cancelled` so the
// envelope can tell an intentional abort from a fault.

impl From<DownloadError> for EngineError {
    fn from(err: DownloadError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Download(err)
        }
    }
}

impl From<InstallError> for EngineError {
    fn from(err: InstallError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Install(err)
        }
    }
}

impl From<RunnerError> for EngineError {
    fn from(err: RunnerError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Runner(err)
        }
    }
}
