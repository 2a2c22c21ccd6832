use camino::Utf8PathBuf;
use thiserror::Error;

/// A transport-level failure: the request never produced a usable response.
///
/// Transport failures are considered transient and retried; the final
/// attempt's failure surfaces as [`DownloadError::Exhausted`].
#[derive(Error, Debug)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

/// Errors raised while downloading a remote artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// All retry attempts were used up.
    #[error("{url} could not be downloaded after {attempts} attempts: {details}")]
    Exhausted {
        url: String,
        attempts: u32,
        details: String,
    },

    /// The server answered with a status that is not worth retrying.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Writing the response body to disk failed; the partial file has been
    /// removed.
    #[error("failed to write {path} while downloading {url}: {source}")]
    Write {
        url: String,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {url} was cancelled")]
    Cancelled { url: String },
}

impl DownloadError {
    /// Whether this error represents cooperative cancellation rather than a
    /// fault.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The URL the failed download was fetching.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Exhausted { url, .. }
            | Self::Status { url, .. }
            | Self::Write { url, .. }
            | Self::Cancelled { url } => url,
        }
    }
}
