use camino::Utf8PathBuf;
use oasguard_fetch::DownloadError;
use oasguard_runner::RunnerError;
use thiserror::Error;

/// Errors raised while installing an external tool.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("failed to download {tool}: {source}")]
    Download {
        tool: String,
        #[source]
        source: DownloadError,
    },

    #[error("failed to decompress {archive}: {details}")]
    Decompress {
        archive: Utf8PathBuf,
        details: String,
    },

    #[error("{tool} could not be installed after {attempts} attempts: {details}")]
    ToolInstall {
        tool: String,
        attempts: u32,
        details: String,
    },

    #[error("process error while installing {tool}: {source}")]
    Runner {
        tool: String,
        #[source]
        source: RunnerError,
    },

    #[error("installed {tool} but expected executable {path} is missing")]
    ExecutableMissing { tool: String, path: Utf8PathBuf },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("installation cancelled")]
    Cancelled,
}

impl InstallError {
    /// Whether this error stems from cooperative cancellation rather than a
    /// fault.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Download { source, .. } => source.is_cancelled(),
            Self::Runner { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
