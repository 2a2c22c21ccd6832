use crate::error::{DownloadError, TransportError};
use crate::transport::{HttpTransport, Transport, TransportResponse};
use bytes::Bytes;
use camino::Utf8Path;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Statuses worth retrying: server errors, request timeout, rate limiting.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

/// Retry policy for a [`Downloader`].
///
/// The computed backoff starts at `initial_backoff` and doubles per attempt;
/// a positive server `Retry-After` hint overrides it.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint
            && hint > Duration::ZERO
        {
            return hint;
        }
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Downloads a single remote artifact to a destination path.
///
/// The operation is idempotent: when the destination already exists the
/// network is never touched, which is what makes re-running a build cheap
/// once its tools are in place.
pub struct Downloader {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Downloader {
    /// Downloader over a real HTTP transport with the default retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self::with_parts(
            Arc::new(HttpTransport::new()?),
            RetryPolicy::default(),
        ))
    }

    /// Downloader over an explicit transport and policy.
    #[must_use]
    pub fn with_parts(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetch `url` into `dest`.
    ///
    /// No-op when `dest` already exists. On any partial-write failure the
    /// destination file is deleted so a half-written artifact can never be
    /// mistaken for a valid cached download on the next run.
    ///
    /// # Errors
    ///
    /// [`DownloadError::Exhausted`] once every attempt has failed with a
    /// retryable condition, [`DownloadError::Status`] for a non-retryable
    /// response, [`DownloadError::Write`] for filesystem failures, and
    /// [`DownloadError::Cancelled`] when the token fires.
    pub async fn download(
        &self,
        url: &str,
        dest: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        if dest.exists() {
            debug!(url = %url, dest = %dest, "destination already exists, skipping download");
            return Ok(());
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=max_attempts {
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(url)),
                response = self.transport.fetch(url) => response,
            };

            match response {
                Ok(response) if response.is_success() => {
                    return self.save_body(response, url, dest, cancel).await;
                }
                Ok(response) if is_retryable_status(response.status) => {
                    last_failure = format!("HTTP {}", response.status);
                    if attempt < max_attempts {
                        warn!(
                            url = %url,
                            status = response.status,
                            attempt,
                            "server error, will retry"
                        );
                        self.wait_before_retry(
                            self.policy.delay_for(attempt, response.retry_after),
                            url,
                            cancel,
                        )
                        .await?;
                    }
                }
                Ok(response) => {
                    return Err(DownloadError::Status {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Err(err) => {
                    last_failure = err.to_string();
                    if attempt < max_attempts {
                        warn!(url = %url, attempt, error = %err, "transport error, will retry");
                        self.wait_before_retry(self.policy.delay_for(attempt, None), url, cancel)
                            .await?;
                    }
                }
            }
        }

        Err(DownloadError::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            details: last_failure,
        })
    }

    async fn wait_before_retry(
        &self,
        delay: Duration,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(self.cancelled(url)),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    async fn save_body(
        &self,
        response: TransportResponse,
        url: &str,
        dest: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(url, dest, source))?;
        }

        let result = self.stream_to_file(response.body, url, dest, cancel).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn stream_to_file(
        &self,
        mut body: BoxStream<'static, Result<Bytes, TransportError>>,
        url: &str,
        dest: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| self.write_error(url, dest, source))?;

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(url)),
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => file
                    .write_all(&bytes)
                    .await
                    .map_err(|source| self.write_error(url, dest, source))?,
                Some(Err(err)) => {
                    return Err(self.write_error(url, dest, std::io::Error::other(err.0)));
                }
                None => break,
            }
        }

        file.flush()
            .await
            .map_err(|source| self.write_error(url, dest, source))?;

        debug!(url = %url, dest = %dest, "download completed");
        Ok(())
    }

    fn cancelled(&self, url: &str) -> DownloadError {
        DownloadError::Cancelled {
            url: url.to_string(),
        }
    }

    fn write_error(&self, url: &str, dest: &Utf8Path, source: std::io::Error) -> DownloadError {
        DownloadError::Write {
            url: url.to_string(),
            path: dest.to_owned(),
            source,
        }
    }
}
