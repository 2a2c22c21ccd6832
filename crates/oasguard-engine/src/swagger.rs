use crate::error::EngineError;
use camino::{Utf8Path, Utf8PathBuf};
use futures::future::try_join_all;
use oasguard_runner::{CommandSpec, ProcessRunner};
use oasguard_utils::{Reporter, ensure_dir_all};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs the spec-generation tool once per document and maintains the
/// baseline files in Generate mode.
///
/// Per-document generations write independent output files, so they run
/// concurrently; each invocation is bounded by its own timeout so one slow
/// generator cannot starve the rest of the run.
pub struct SpecGenerator {
    runner: Arc<dyn ProcessRunner>,
    reporter: Arc<Reporter>,
    assembly_path: Utf8PathBuf,
    output_dir: Utf8PathBuf,
    timeout: Duration,
}

impl SpecGenerator {
    #[must_use]
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        reporter: Arc<Reporter>,
        assembly_path: Utf8PathBuf,
        output_dir: Utf8PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            reporter,
            assembly_path,
            output_dir,
            timeout,
        }
    }

    /// Generate a spec for every document name, concurrently.
    ///
    /// Returns the generated file paths in document order.
    ///
    /// # Errors
    ///
    /// Fails when any invocation exits non-zero, times out, or does not
    /// produce its output file.
    pub async fn generate_all(
        &self,
        exe: &Utf8Path,
        document_names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Utf8PathBuf>, EngineError> {
        ensure_dir_all(&self.output_dir)
            .map_err(|source| EngineError::io(self.output_dir.clone(), source))?;

        try_join_all(
            document_names
                .iter()
                .map(|name| self.generate_one(exe, name, cancel)),
        )
        .await
    }

    async fn generate_one(
        &self,
        exe: &Utf8Path,
        document_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Utf8PathBuf, EngineError> {
        let output = self
            .output_dir
            .join(format!("openapi-{}.yaml", document_name.to_lowercase()));

        debug!(document = %document_name, output = %output, "generating OpenAPI spec");

        let cmd = CommandSpec::new(exe.as_str()).args([
            "tofile",
            "--output",
            output.as_str(),
            "--yaml",
            self.assembly_path.as_str(),
            document_name,
        ]);

        let result = tokio::time::timeout(self.timeout, self.runner.run(&cmd, cancel))
            .await
            .map_err(|_| EngineError::SpecGenTimeout {
                document: document_name.to_string(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(EngineError::from)?;

        if !result.success() {
            return Err(EngineError::ToolFailed {
                tool: "swagger".to_string(),
                document: document_name.to_string(),
                details: result.stderr_string(),
            });
        }

        if !output.exists() {
            return Err(EngineError::MissingToolOutput {
                tool: "swagger".to_string(),
                path: output,
            });
        }

        Ok(output)
    }

    /// Overwrite the tracked baseline files with their freshly generated
    /// counterparts.
    ///
    /// A baseline without a generated counterpart is reported as a warning
    /// and skipped; the rest of the set is still updated.
    ///
    /// # Errors
    ///
    /// Fails when a copy itself fails.
    pub async fn update_baselines(
        &self,
        baselines: &[Utf8PathBuf],
        generated: &[Utf8PathBuf],
    ) -> Result<(), EngineError> {
        self.reporter.info("Updating specification files...");

        for baseline in baselines {
            let file_name = baseline.file_name().unwrap_or_default();
            let Some(source) = generated.iter().find(|g| g.as_str().contains(file_name)) else {
                self.reporter.warn(&format!(
                    "could not find a generated spec file for {baseline}; skipping"
                ));
                continue;
            };

            self.reporter
                .info(&format!("Overwriting {baseline} with {source}."));
            tokio::fs::copy(source, baseline)
                .await
                .map_err(|io| EngineError::io(baseline.clone(), io))?;
        }

        Ok(())
    }
}
