//! Artifact downloading for oasguard
//!
//! External tools arrive as release artifacts over HTTP. This crate provides
//! a [`Downloader`] that tolerates transient network and server failures with
//! bounded retries and exponential backoff, honors server `Retry-After`
//! hints, and never leaves a half-written artifact behind.
//!
//! There is no process-wide HTTP client: a `Downloader` is constructed
//! explicitly and passed to whoever needs it, with the raw send abstracted
//! behind [`Transport`] so tests can script responses.

pub mod downloader;
pub mod error;
pub mod transport;

pub use downloader::{Downloader, RetryPolicy, is_retryable_status};
pub use error::{DownloadError, TransportError};
pub use transport::{HttpTransport, Transport, TransportResponse};
