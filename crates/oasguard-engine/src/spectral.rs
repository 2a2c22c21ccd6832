use crate::error::EngineError;
use camino::{Utf8Path, Utf8PathBuf};
use oasguard_checksum::ChecksumStore;
use oasguard_runner::{CommandSpec, ProcessRunner, grant_execute_permission};
use oasguard_utils::{Reporter, ensure_dir_all, file_stem_of};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Matches the lint tool's summary line, e.g.
/// `6 problems (1 error, 2 warnings, 3 infos, 0 hints)`.
static PROBLEM_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[0-9]+ problems? \((?<errors>[0-9]+) errors?, (?<warnings>[0-9]+) warnings?, [0-9]+ infos?, [0-9]+ hints?\)",
    )
    .expect("problem summary pattern is valid")
});

/// Runs Spectral once per document, gated by the checksum store.
///
/// When neither the ruleset nor any tracked document changed since the last
/// snapshot, and a prior report exists for every document, the whole phase
/// is skipped and the prior reports are surfaced instead. Otherwise
/// documents are linted sequentially (ordered report output) and a fresh
/// snapshot is saved only after all of them linted successfully.
pub struct SpectralRunner {
    runner: Arc<dyn ProcessRunner>,
    checksums: ChecksumStore,
    reports_dir: Utf8PathBuf,
    reporter: Arc<Reporter>,
}

impl SpectralRunner {
    #[must_use]
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        checksums: ChecksumStore,
        reports_dir: impl Into<Utf8PathBuf>,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self {
            runner,
            checksums,
            reports_dir: reports_dir.into(),
            reporter,
        }
    }

    /// Lint every document against the ruleset, or surface the previous
    /// reports when nothing changed.
    ///
    /// # Errors
    ///
    /// A lint invocation that does not produce its report file is a hard
    /// failure; rule violations (non-zero exit with a report) are warnings.
    pub async fn run(
        &self,
        exe: &Utf8Path,
        ruleset: &Utf8Path,
        documents: &[Utf8PathBuf],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.reporter
            .info("Validating OpenAPI documents against the ruleset...");

        if !self.should_run(ruleset, documents).await? {
            self.reporter.info(
                "Lint step skipped since the OpenAPI documents and ruleset have not changed.",
            );
            for document in documents {
                self.surface_previous_report(document).await?;
            }
            return Ok(());
        }

        ensure_dir_all(&self.reports_dir)
            .map_err(|source| EngineError::io(self.reports_dir.clone(), source))?;
        grant_execute_permission(exe)?;

        for document in documents {
            self.lint_document(exe, ruleset, document, cancel).await?;
        }

        self.checksums.save_snapshot(ruleset, documents).await?;
        Ok(())
    }

    async fn should_run(
        &self,
        ruleset: &Utf8Path,
        documents: &[Utf8PathBuf],
    ) -> Result<bool, EngineError> {
        if self.checksums.has_ruleset_changed(ruleset).await? {
            return Ok(true);
        }
        if self.checksums.has_any_document_changed(documents).await? {
            return Ok(true);
        }
        // A report deleted out from under us also forces a run.
        Ok(documents
            .iter()
            .any(|document| !self.report_path(document).exists()))
    }

    fn report_path(&self, document: &Utf8Path) -> Utf8PathBuf {
        self.reports_dir
            .join(format!("spectral-{}.txt", file_stem_of(document)))
    }

    async fn surface_previous_report(&self, document: &Utf8Path) -> Result<(), EngineError> {
        let report = self.report_path(document);
        let content = tokio::fs::read_to_string(&report)
            .await
            .map_err(|source| EngineError::io(report.clone(), source))?;

        for line in content.lines() {
            if let Some(caps) = PROBLEM_SUMMARY.captures(line) {
                let errors: u32 = caps["errors"].parse().unwrap_or(0);
                let warnings: u32 = caps["warnings"].parse().unwrap_or(0);
                if errors > 0 || warnings > 0 {
                    self.reporter
                        .warn(&format!("lint problems from previous run: {line}"));
                    continue;
                }
            }
            self.reporter.info(line);
        }

        self.reporter
            .info(&format!("Previous report available at {report}"));
        Ok(())
    }

    async fn lint_document(
        &self,
        exe: &Utf8Path,
        ruleset: &Utf8Path,
        document: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let report = self.report_path(document);

        self.reporter
            .info(&format!("Linting {document} against {ruleset}"));

        if report.exists() {
            debug!(report = %report, "deleting stale report");
            tokio::fs::remove_file(&report)
                .await
                .map_err(|source| EngineError::io(report.clone(), source))?;
        }

        let cmd = CommandSpec::new(exe.as_str()).args([
            "lint",
            document.as_str(),
            "--ruleset",
            ruleset.as_str(),
            "--format",
            "pretty",
            "--format",
            "stylish",
            "--output.stylish",
            report.as_str(),
            "--fail-severity=warn",
        ]);

        let output = self.runner.run(&cmd, cancel).await?;

        let stdout = output.stdout_string();
        if !stdout.trim().is_empty() {
            self.reporter.info(&stdout);
        }
        let stderr = output.stderr_string();
        if !stderr.trim().is_empty() {
            self.reporter.warn(&stderr);
        }

        if !report.exists() {
            return Err(EngineError::MissingToolOutput {
                tool: "spectral".to_string(),
                path: report,
            });
        }

        if !output.success() {
            self.reporter.warn(&format!(
                "ruleset violations found in {document}; see the report at {report}"
            ));
        }

        attach_report_to_build(&report);
        self.reporter.info(&format!("Lint report written to {report}"));
        Ok(())
    }
}

/// Attach a report to the CI build summary when running under an Azure
/// DevOps agent.
fn attach_report_to_build(report: &Utf8Path) {
    if std::env::var_os("SYSTEM_TEAMFOUNDATIONCOLLECTIONURI").is_some() {
        println!(
            "##vso[task.addattachment type=Distributedtask.Core.Summary;name=Spectral results;]{report}"
        );
    }
}
