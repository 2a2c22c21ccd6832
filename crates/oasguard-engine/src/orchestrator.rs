use crate::config::{Mode, RunConfig};
use crate::error::EngineError;
use crate::oasdiff::DiffRunner;
use crate::ruleset::RulesetManager;
use crate::spectral::SpectralRunner;
use crate::swagger::SpecGenerator;
use camino::Utf8PathBuf;
use oasguard_checksum::ChecksumStore;
use oasguard_fetch::Downloader;
use oasguard_install::{InstallPolicy, Installer, Platform, ToolDescriptor};
use oasguard_runner::ProcessRunner;
use oasguard_utils::Reporter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Which optional steps a run performs, derived from mode and toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    /// Run the spec generator (and install it).
    generate: bool,
    /// Diff baselines against generated specs (and install the diff tool).
    compare: bool,
    /// Overwrite baselines with the generated specs.
    overwrite: bool,
}

impl StepPlan {
    fn for_config(config: &RunConfig) -> Self {
        match config.mode {
            Mode::Generate => {
                let generate = !config.disable_specgen;
                Self {
                    generate,
                    compare: generate && config.compare_code_against_baseline,
                    overwrite: generate && !config.compare_code_against_baseline,
                }
            }
            Mode::Validate => Self {
                generate: config.compare_code_against_baseline,
                compare: config.compare_code_against_baseline,
                overwrite: false,
            },
        }
    }
}

/// Drives the end-to-end sequence for one run:
/// install → generate/compare → lint.
///
/// Configuration errors and missing baselines are caught before any network
/// or process work is scheduled. Low-level faults are converted into
/// reporter errors plus a `false` return at this boundary; only cancellation
/// propagates out, for the envelope to interpret.
pub struct Orchestrator {
    config: RunConfig,
    reporter: Arc<Reporter>,
    downloader: Arc<Downloader>,
    runner: Arc<dyn ProcessRunner>,
    install_policy: InstallPolicy,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: RunConfig,
        reporter: Arc<Reporter>,
        downloader: Arc<Downloader>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            config,
            reporter,
            downloader,
            runner,
            install_policy: InstallPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_install_policy(mut self, policy: InstallPolicy) -> Self {
        self.install_policy = policy;
        self
    }

    /// Execute the configured run.
    ///
    /// Returns `Ok(true)` when the run completed without a hard failure (and
    /// without promoted warnings), `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// Only [`EngineError::Cancelled`] escapes; every other fault is
    /// reported and folded into `Ok(false)`.
    pub async fn execute(&self, cancel: &CancellationToken) -> Result<bool, EngineError> {
        if let Err(err) = self.config.validate() {
            self.reporter.warn(&err.to_string());
            return Ok(false);
        }

        if self.config.mode == Mode::Validate
            && let Some(missing) = self.config.first_missing_baseline()
        {
            self.reporter.warn(&format!(
                "the baseline specification '{missing}' does not exist; if this is the first \
                 run, generate it with the generate mode and commit the generated file"
            ));
            return Ok(false);
        }

        match self.run_pipeline(cancel).await {
            Ok(()) => Ok(self.reporter.succeeded()),
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                self.reporter
                    .error(&format!("contract pipeline failed: {err}"));
                Ok(false)
            }
        }
    }

    async fn run_pipeline(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        let plan = StepPlan::for_config(&self.config);
        let platform = Platform::detect()?;

        self.reporter.info("Installing OpenAPI tool dependencies...");

        let installer = Installer::with_policy(
            self.downloader.clone(),
            self.runner.clone(),
            self.config.tools_root.clone(),
            self.install_policy,
        );
        let ruleset_manager = RulesetManager::new(
            self.config.ruleset.clone(),
            self.config.profile,
            self.downloader.clone(),
            self.config.rulesets_dir(),
        );

        let spectral_tool = ToolDescriptor::spectral(platform);
        let swagger_tool = plan.generate.then(|| ToolDescriptor::swagger_cli(platform));
        let oasdiff_tool = plan.compare.then(|| ToolDescriptor::oasdiff(platform));

        let (ruleset_path, spectral_exe, swagger_exe, oasdiff_exe) = tokio::try_join!(
            ruleset_manager.resolve(cancel),
            async {
                installer
                    .install(&spectral_tool, cancel)
                    .await
                    .map_err(EngineError::from)
            },
            install_optional(&installer, swagger_tool.as_ref(), cancel),
            install_optional(&installer, oasdiff_tool.as_ref(), cancel),
        )?;

        self.reporter
            .info("Finished installing OpenAPI tool dependencies.");

        let generated = if let Some(exe) = &swagger_exe {
            self.reporter
                .info("Generating OpenAPI specifications from code...");
            let generator = self.spec_generator();
            let generated = generator
                .generate_all(exe, &self.config.document_names, cancel)
                .await?;
            if plan.overwrite {
                generator
                    .update_baselines(&self.config.baseline_paths, &generated)
                    .await?;
            }
            generated
        } else {
            Vec::new()
        };

        if let Some(exe) = &oasdiff_exe {
            self.reporter
                .info("Comparing baselines against generated specifications...");
            DiffRunner::new(self.runner.clone(), self.reporter.clone())
                .run(exe, &self.config.baseline_paths, &generated, cancel)
                .await?;
        }

        let spectral = SpectralRunner::new(
            self.runner.clone(),
            ChecksumStore::new(self.config.checksums_dir()),
            self.config.reports_dir(),
            self.reporter.clone(),
        );
        spectral
            .run(&spectral_exe, &ruleset_path, &self.config.baseline_paths, cancel)
            .await?;

        Ok(())
    }

    fn spec_generator(&self) -> SpecGenerator {
        SpecGenerator::new(
            self.runner.clone(),
            self.reporter.clone(),
            self.config.assembly_path.clone(),
            self.config.generated_dir(),
            self.config.specgen_timeout,
        )
    }
}

async fn install_optional(
    installer: &Installer,
    tool: Option<&ToolDescriptor>,
    cancel: &CancellationToken,
) -> Result<Option<Utf8PathBuf>, EngineError> {
    match tool {
        Some(tool) => installer
            .install(tool, cancel)
            .await
            .map(Some)
            .map_err(EngineError::from),
        None => Ok(None),
    }
}
