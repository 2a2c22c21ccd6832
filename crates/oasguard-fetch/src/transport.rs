use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use tracing::debug;

/// Connect timeout for the underlying HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single HTTP response, reduced to what the retry loop needs.
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Server retry hint, already resolved to a duration from now.
    ///
    /// `Retry-After` can be a delta in seconds or an absolute HTTP date;
    /// both forms are resolved here so the retry loop stays clock-free.
    pub retry_after: Option<Duration>,
    /// Response body as a byte stream
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl TransportResponse {
    /// Whether the status is a 2xx success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Seam between the retry loop and the network.
///
/// The production implementation is [`HttpTransport`]; tests substitute a
/// scripted fake to exercise the retry policy deterministically.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET request for the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained at all
    /// (connection failure, client-side timeout). Non-success statuses are
    /// returned as an `Ok` response; classifying them is the caller's job.
    async fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with connection pooling and a connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the client cannot be constructed.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .use_rustls_tls()
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers(), Utc::now());

        debug!(url = %url, status, "received response");

        Ok(TransportResponse {
            status,
            retry_after,
            body: response.bytes_stream().map(|r| r.map_err(TransportError::from)).boxed(),
        })
    }
}

/// Parse a `Retry-After` header into a duration from `now`.
///
/// Accepts both forms from RFC 9110: a non-negative delta in seconds, or an
/// HTTP date. An absolute date in the past resolves to `None`.
fn parse_retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;

    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value.trim()).ok()?;
    (date.with_timezone(&Utc) - now).to_std().ok()
}
