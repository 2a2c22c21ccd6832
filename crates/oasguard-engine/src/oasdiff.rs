use crate::error::EngineError;
use camino::{Utf8Path, Utf8PathBuf};
use oasguard_runner::{CommandSpec, ProcessRunner};
use oasguard_utils::Reporter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Elements whose differences never constitute contract drift.
const EXCLUDED_ELEMENTS: &str = "description,examples,title,summary";

/// Runs the diff tool to compare each baseline against its freshly
/// generated counterpart.
///
/// Documents are diffed sequentially: diff invocations write into a shared
/// report area, and ordered output keeps the build log readable.
///
/// Drift is a *finding*, not a fault: it surfaces as a warning (promotable
/// through the reporter), while a failure to invoke the tool at all is a
/// hard error.
pub struct DiffRunner {
    runner: Arc<dyn ProcessRunner>,
    reporter: Arc<Reporter>,
}

impl DiffRunner {
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>, reporter: Arc<Reporter>) -> Self {
        Self { runner, reporter }
    }

    /// Diff every baseline against its generated counterpart, in order.
    ///
    /// A baseline without a generated counterpart is reported as a warning
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Fails when a diff-tool invocation itself fails (spawn error or
    /// cancellation), not when drift is found.
    pub async fn run(
        &self,
        exe: &Utf8Path,
        baselines: &[Utf8PathBuf],
        generated: &[Utf8PathBuf],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        for baseline in baselines {
            let file_name = baseline.file_name().unwrap_or_default();
            let Some(counterpart) = generated.iter().find(|g| g.as_str().contains(file_name))
            else {
                self.reporter.warn(&format!(
                    "could not find a generated spec file for {baseline}; skipping comparison"
                ));
                continue;
            };

            self.diff_one(exe, baseline, counterpart, cancel).await?;
        }

        Ok(())
    }

    async fn diff_one(
        &self,
        exe: &Utf8Path,
        baseline: &Utf8Path,
        generated: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        debug!(baseline = %baseline, generated = %generated, "diffing contract documents");

        let cmd = CommandSpec::new(exe.as_str()).args([
            "diff",
            baseline.as_str(),
            generated.as_str(),
            "--exclude-elements",
            EXCLUDED_ELEMENTS,
            "-f",
            "text",
        ]);

        let output = self.runner.run(&cmd, cancel).await?;

        let diff = output.stdout_string();
        if !diff.trim().is_empty() || !output.success() {
            self.reporter.warn(&format!(
                "contract drift between {baseline} and the spec generated from code:\n{diff}"
            ));
        } else {
            self.reporter
                .info(&format!("no drift detected for {baseline}"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oasguard_runner::{ProcessOutput, RunnerError};
    use std::sync::Mutex;

    struct DiffStub {
        stdout: &'static str,
        exit_code: i32,
        invocations: Mutex<Vec<Vec<String>>>,
    }

    impl DiffStub {
        fn new(stdout: &'static str, exit_code: i32) -> Arc<Self> {
            Arc::new(Self {
                stdout,
                exit_code,
                invocations: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProcessRunner for DiffStub {
        async fn run(
            &self,
            cmd: &CommandSpec,
            _cancel: &CancellationToken,
        ) -> Result<ProcessOutput, RunnerError> {
            self.invocations.lock().unwrap().push(
                cmd.args
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
            );
            Ok(ProcessOutput::new(
                Some(self.exit_code),
                self.stdout.as_bytes().to_vec(),
                Vec::new(),
            ))
        }
    }

    #[tokio::test]
    async fn clean_diff_produces_no_warning() {
        let stub = DiffStub::new("", 0);
        let reporter = Arc::new(Reporter::new(false));
        let diff = DiffRunner::new(stub.clone(), reporter.clone());

        diff.run(
            Utf8Path::new("oasdiff"),
            &[Utf8PathBuf::from("openapi-v1.yaml")],
            &[Utf8PathBuf::from("generated/openapi-v1.yaml")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(reporter.warning_count(), 0);
        assert_eq!(stub.invocations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_empty_diff_output_is_drift() {
        let stub = DiffStub::new("GET /pets response changed", 0);
        let reporter = Arc::new(Reporter::new(false));
        let diff = DiffRunner::new(stub, reporter.clone());

        diff.run(
            Utf8Path::new("oasdiff"),
            &[Utf8PathBuf::from("openapi-v1.yaml")],
            &[Utf8PathBuf::from("generated/openapi-v1.yaml")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(reporter.warning_count(), 1);
        assert!(reporter.succeeded());
    }

    #[tokio::test]
    async fn diff_invocation_passes_exclusions_and_text_format() {
        let stub = DiffStub::new("", 0);
        let diff = DiffRunner::new(stub.clone(), Arc::new(Reporter::new(false)));

        diff.run(
            Utf8Path::new("oasdiff"),
            &[Utf8PathBuf::from("openapi-v1.yaml")],
            &[Utf8PathBuf::from("generated/openapi-v1.yaml")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let invocations = stub.invocations.lock().unwrap();
        let args = &invocations[0];
        assert_eq!(args[0], "diff");
        assert!(args.contains(&"--exclude-elements".to_string()));
        assert!(args.contains(&EXCLUDED_ELEMENTS.to_string()));
        assert!(args.contains(&"text".to_string()));
    }

    #[tokio::test]
    async fn missing_counterpart_warns_and_skips() {
        let stub = DiffStub::new("", 0);
        let reporter = Arc::new(Reporter::new(false));
        let diff = DiffRunner::new(stub.clone(), reporter.clone());

        diff.run(
            Utf8Path::new("oasdiff"),
            &[Utf8PathBuf::from("openapi-v9.yaml")],
            &[Utf8PathBuf::from("generated/openapi-v1.yaml")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(reporter.warning_count(), 1);
        assert!(stub.invocations.lock().unwrap().is_empty());
    }
}
