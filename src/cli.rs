//! Command-line interface for oasguard
//!
//! Maps the build-system invocation contract onto the engine: operating
//! mode, positionally paired document names and baseline paths, ruleset
//! locator and profile, the compare and warnings-as-errors toggles, and the
//! tools root directory.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use oasguard_engine::{Envelope, Mode, Orchestrator, Profile, RulesetLocator, RunConfig};
use oasguard_fetch::Downloader;
use oasguard_runner::NativeRunner;
use oasguard_utils::{Reporter, init_tracing};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// oasguard - OpenAPI contract validation and generation for build pipelines
#[derive(Parser)]
#[command(name = "oasguard")]
#[command(about = "Validate or generate OpenAPI contract documents from your build")]
#[command(long_about = r#"
oasguard orchestrates the external OpenAPI tooling for a build pipeline:
it installs Spectral, oasdiff and the swagger CLI concurrently (cached by
pinned version), generates contract documents from your code, diffs them
against source-controlled baselines, and lints everything against a ruleset.
Unchanged inputs skip the expensive lint step via content checksums.

EXAMPLES:
  # Validate committed baselines against the backend ruleset
  oasguard --mode validate --document v1 --baseline openapi-v1.yaml \
      --assembly bin/Release/MyApi.dll

  # Validate and also compare the baselines against freshly generated specs
  oasguard --mode validate --document v1 --baseline openapi-v1.yaml \
      --assembly bin/Release/MyApi.dll --compare-code-against-baseline

  # Regenerate the baselines from code
  oasguard --mode generate --document v1 --baseline openapi-v1.yaml \
      --assembly bin/Release/MyApi.dll

MODES:
  generate   Produce contract documents from code and overwrite the baselines
             (or diff against them with --compare-code-against-baseline)
  validate   Treat the baselines as ground truth; lint them, optionally
             comparing against freshly generated documents

Exit code is 0 on success and 1 on failure; rule violations and contract
drift are warnings unless --warnings-as-errors is set.
"#)]
#[command(version)]
pub struct Cli {
    /// Operating mode: generate or validate (legacy aliases accepted)
    #[arg(long)]
    pub mode: String,

    /// Swagger document name; repeat once per document
    #[arg(long = "document", value_name = "NAME", required = true)]
    pub documents: Vec<String>,

    /// Baseline specification path, positionally paired with --document
    #[arg(long = "baseline", value_name = "PATH", required = true)]
    pub baselines: Vec<Utf8PathBuf>,

    /// Ruleset URL or local path (defaults to the profile's ruleset)
    #[arg(long)]
    pub ruleset: Option<String>,

    /// Ruleset profile: backend or frontend
    #[arg(long, default_value = "backend")]
    pub profile: String,

    /// Also generate specs from code and diff them against the baselines
    #[arg(long)]
    pub compare_code_against_baseline: bool,

    /// Promote rule violations and contract drift to hard failures
    #[arg(long)]
    pub warnings_as_errors: bool,

    /// Directory the tools, reports and checksums live under
    #[arg(long, default_value = ".oasguard", value_name = "DIR")]
    pub tools_dir: Utf8PathBuf,

    /// Build artifact the spec generator reads the API shape from
    #[arg(long, value_name = "PATH")]
    pub assembly: Utf8PathBuf,

    /// Working directory for tool invocations
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub working_dir: Utf8PathBuf,

    /// Overall time ceiling for the run, in seconds
    #[arg(long, default_value_t = 300, value_name = "SECONDS")]
    pub timeout_secs: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse arguments, run the orchestration, and report the outcome.
///
/// Returns `Ok(false)` for every failure that was already reported through
/// the logging sink (configuration errors, tool faults, cancellation);
/// `Err` is reserved for setup problems like a broken runtime.
///
/// # Errors
///
/// Returns an error when the async runtime or the HTTP client cannot be
/// constructed.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("failed to initialize logging: {err}");
    }

    let reporter = Arc::new(Reporter::new(cli.warnings_as_errors));

    // Configuration errors short-circuit before any expensive work.
    let mode = match cli.mode.parse::<Mode>() {
        Ok(mode) => mode,
        Err(err) => {
            reporter.warn(&err.to_string());
            return Ok(false);
        }
    };
    let profile = match cli.profile.parse::<Profile>() {
        Ok(profile) => profile,
        Err(err) => {
            reporter.warn(&err.to_string());
            return Ok(false);
        }
    };

    let config = RunConfig {
        mode,
        document_names: cli.documents,
        baseline_paths: cli.baselines,
        ruleset: cli.ruleset.as_deref().map(RulesetLocator::parse),
        profile,
        compare_code_against_baseline: cli.compare_code_against_baseline,
        warnings_as_errors: cli.warnings_as_errors,
        tools_root: cli.tools_dir,
        assembly_path: cli.assembly,
        working_dir: cli.working_dir,
        disable_specgen: RunConfig::specgen_disabled_from_env(),
        envelope_timeout: Duration::from_secs(cli.timeout_secs),
        specgen_timeout: RunConfig::default_specgen_timeout(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    runtime.block_on(async move {
        let user_cancel = CancellationToken::new();
        let signal_token = user_cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_token.cancel();
            }
        });

        let downloader =
            Arc::new(Downloader::new().context("failed to build HTTP client")?);
        let runner = Arc::new(NativeRunner::new());
        let envelope = Envelope::new(config.envelope_timeout);
        let orchestrator = Orchestrator::new(config, reporter.clone(), downloader, runner);

        let ok = envelope
            .run(&user_cancel, &reporter, |cancel| async move {
                orchestrator.execute(&cancel).await
            })
            .await?;

        Ok(ok)
    })
}
