//! Structural logging sink for orchestration output
//!
//! Every user-facing message produced during a run flows through [`Reporter`]
//! as a `{message, severity}` pair. The "treat warnings as errors" build
//! toggle is applied here, at the sink boundary, instead of being scattered
//! through the pipeline steps: a promoted warning is indistinguishable from
//! an error by the time it reaches tracing, and it marks the run as failed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{error, info, warn};

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Logging sink that tracks whether any error was emitted during a run.
///
/// Overall run success is derived from the sink: a run succeeds when no
/// message with [`Severity::Error`] reached it. With `warn_as_error` enabled,
/// warnings are promoted before they are recorded, so a single rule violation
/// is enough to fail the build.
#[derive(Debug)]
pub struct Reporter {
    warn_as_error: bool,
    had_error: AtomicBool,
    warning_count: AtomicUsize,
}

impl Reporter {
    #[must_use]
    pub fn new(warn_as_error: bool) -> Self {
        Self {
            warn_as_error,
            had_error: AtomicBool::new(false),
            warning_count: AtomicUsize::new(0),
        }
    }

    /// Emit a message at the given severity.
    ///
    /// Warnings are promoted to errors when the reporter was constructed with
    /// `warn_as_error`; the promotion happens before the message is recorded,
    /// so [`had_error`](Self::had_error) reflects it.
    pub fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!("{message}"),
            Severity::Warning if self.warn_as_error => {
                self.warning_count.fetch_add(1, Ordering::Relaxed);
                self.record_error(message);
            }
            Severity::Warning => {
                self.warning_count.fetch_add(1, Ordering::Relaxed);
                warn!("{message}");
            }
            Severity::Error => self.record_error(message),
        }
    }

    pub fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Severity::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    /// Whether any error (including a promoted warning) reached the sink.
    #[must_use]
    pub fn had_error(&self) -> bool {
        self.had_error.load(Ordering::Relaxed)
    }

    /// Number of warnings emitted, counted before promotion.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warning_count.load(Ordering::Relaxed)
    }

    /// Run outcome as seen by the sink: true when no error was recorded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.had_error()
    }

    fn record_error(&self, message: &str) {
        self.had_error.store(true, Ordering::Relaxed);
        error!("{message}");
    }
}
