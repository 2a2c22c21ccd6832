use crate::error::EngineError;
use oasguard_utils::Reporter;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bounded-time, cooperatively-cancellable scope around the orchestration.
///
/// A child token is derived from the caller's token; when the ceiling
/// elapses first, the child is cancelled and the wrapped operation observes
/// it exactly as if the caller had cancelled. The child token is cancelled
/// on every exit path.
///
/// Only cancellation is intercepted here: a user-initiated cancel returns
/// `false` silently (it is an intentional abort, not a fault), a ceiling
/// cancel returns `false` with a logged warning, and any other fault from
/// the wrapped operation propagates untouched.
pub struct Envelope {
    ceiling: Duration,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }
}

impl Envelope {
    #[must_use]
    pub fn new(ceiling: Duration) -> Self {
        Self { ceiling }
    }

    /// Run `operation` under this envelope.
    ///
    /// # Errors
    ///
    /// Propagates any non-cancellation [`EngineError`] from the operation.
    pub async fn run<F, Fut>(
        &self,
        user: &CancellationToken,
        reporter: &Reporter,
        operation: F,
    ) -> Result<bool, EngineError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<bool, EngineError>>,
    {
        let scoped = user.child_token();
        let _guard = scoped.clone().drop_guard();

        let op = operation(scoped.clone());
        tokio::pin!(op);

        let ceiling = tokio::time::sleep(self.ceiling);
        tokio::pin!(ceiling);

        let mut timed_out = false;
        let result = loop {
            tokio::select! {
                result = &mut op => break result,
                () = &mut ceiling, if !timed_out => {
                    timed_out = true;
                    scoped.cancel();
                }
            }
        };

        match result {
            Err(err) if err.is_cancelled() => {
                if timed_out {
                    reporter.warn(&format!(
                        "run exceeded the {}s ceiling and was cancelled",
                        self.ceiling.as_secs()
                    ));
                } else {
                    debug!("run cancelled by caller");
                }
                Ok(false)
            }
            other => other,
        }
    }
}
