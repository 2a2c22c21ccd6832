//! End-to-end orchestrator flows over stubbed tools and transport.
//!
//! The external tools are emulated by a [`ToolStub`] that behaves like the
//! real binaries at the file level (the lint tool writes its report, the
//! generator writes its output file, the diff tool prints drift), and the
//! network is a counting transport that fails any request it receives —
//! every flow below is expected to run entirely from a warm tools
//! directory.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use futures::StreamExt;
use oasguard_engine::{Mode, Orchestrator, Profile, RulesetLocator, RunConfig};
use oasguard_fetch::{Downloader, RetryPolicy, Transport, TransportError, TransportResponse};
use oasguard_install::{Platform, ToolDescriptor};
use oasguard_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use oasguard_utils::Reporter;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Transport that rejects every request with HTTP 500 and counts them.
struct CountingTransport {
    calls: AtomicU32,
}

impl CountingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn fetch(&self, _url: &str) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransportResponse {
            status: 500,
            retry_after: None,
            body: futures::stream::empty().boxed(),
        })
    }
}

/// File-level emulation of the three external tools.
struct ToolStub {
    lint_exit_code: i32,
    lint_report_body: String,
    diff_output: String,
    invocations: Mutex<Vec<String>>,
}

impl ToolStub {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            lint_exit_code: 0,
            lint_report_body: "0 problems (0 errors, 0 warnings, 0 infos, 0 hints)\n".to_string(),
            diff_output: String::new(),
            invocations: Mutex::new(Vec::new()),
        })
    }

    fn with_lint_violations() -> Arc<Self> {
        Arc::new(Self {
            lint_exit_code: 1,
            lint_report_body: "3 problems (1 error, 2 warnings, 0 infos, 0 hints)\n".to_string(),
            diff_output: String::new(),
            invocations: Mutex::new(Vec::new()),
        })
    }

    fn with_drift(drift: &str) -> Arc<Self> {
        Arc::new(Self {
            lint_exit_code: 0,
            lint_report_body: "0 problems (0 errors, 0 warnings, 0 infos, 0 hints)\n".to_string(),
            diff_output: drift.to_string(),
            invocations: Mutex::new(Vec::new()),
        })
    }

    fn count_of(&self, verb: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v == &verb)
            .count()
    }

    fn total_calls(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

fn arg_after(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag).map(|i| args[i + 1].clone())
}

#[async_trait]
impl ProcessRunner for ToolStub {
    async fn run(
        &self,
        cmd: &CommandSpec,
        _cancel: &CancellationToken,
    ) -> Result<ProcessOutput, RunnerError> {
        let args: Vec<String> = cmd
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let verb = args.first().cloned().unwrap_or_default();
        self.invocations.lock().unwrap().push(verb.clone());

        match verb.as_str() {
            "lint" => {
                let report = arg_after(&args, "--output.stylish").unwrap();
                std::fs::write(&report, &self.lint_report_body).unwrap();
                Ok(ProcessOutput::new(
                    Some(self.lint_exit_code),
                    self.lint_report_body.clone().into_bytes(),
                    Vec::new(),
                ))
            }
            "tofile" => {
                let output = arg_after(&args, "--output").unwrap();
                std::fs::write(&output, "openapi: 3.0.0\ninfo:\n  title: generated\n").unwrap();
                Ok(ProcessOutput::new(Some(0), Vec::new(), Vec::new()))
            }
            "diff" => Ok(ProcessOutput::new(
                Some(0),
                self.diff_output.clone().into_bytes(),
                Vec::new(),
            )),
            other => panic!("unexpected tool invocation: {other}"),
        }
    }
}

struct Harness {
    _tmp: tempfile::TempDir,
    root: Utf8PathBuf,
    transport: Arc<CountingTransport>,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        Self {
            _tmp: tmp,
            root,
            transport: CountingTransport::new(),
        }
    }

    fn tools_root(&self) -> Utf8PathBuf {
        self.root.join("tools")
    }

    fn write_baseline(&self, name: &str, content: &str) -> Utf8PathBuf {
        let specs = self.root.join("specs");
        std::fs::create_dir_all(&specs).unwrap();
        let path = specs.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_ruleset(&self) -> Utf8PathBuf {
        let path = self.root.join(".spectral.yaml");
        std::fs::write(&path, "extends: [\"spectral:oas\"]\nrules: {}\n").unwrap();
        path
    }

    fn preinstall(&self, tool: &ToolDescriptor) {
        let exe = tool.executable_path(&self.tools_root());
        std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
        std::fs::write(&exe, b"stub binary").unwrap();
    }

    fn preinstall_spectral(&self) {
        self.preinstall(&ToolDescriptor::spectral(Platform::detect().unwrap()));
    }

    fn preinstall_swagger(&self) {
        self.preinstall(&ToolDescriptor::swagger_cli(Platform::detect().unwrap()));
    }

    fn preinstall_oasdiff(&self) {
        self.preinstall(&ToolDescriptor::oasdiff(Platform::detect().unwrap()));
    }

    fn config(&self, mode: Mode, baselines: Vec<Utf8PathBuf>, ruleset: Utf8PathBuf) -> RunConfig {
        RunConfig {
            mode,
            document_names: baselines
                .iter()
                .map(|b| {
                    b.file_stem()
                        .unwrap()
                        .trim_start_matches("openapi-")
                        .to_string()
                })
                .collect(),
            baseline_paths: baselines,
            ruleset: Some(RulesetLocator::LocalPath(ruleset)),
            profile: Profile::Backend,
            compare_code_against_baseline: false,
            warnings_as_errors: false,
            tools_root: self.tools_root(),
            assembly_path: self.root.join("api.dll"),
            working_dir: self.root.clone(),
            disable_specgen: false,
            envelope_timeout: RunConfig::default_envelope_timeout(),
            specgen_timeout: RunConfig::default_specgen_timeout(),
        }
    }

    fn orchestrator(
        &self,
        config: RunConfig,
        runner: Arc<dyn ProcessRunner>,
        reporter: Arc<Reporter>,
    ) -> Orchestrator {
        let downloader = Arc::new(Downloader::with_parts(
            self.transport.clone(),
            RetryPolicy {
                max_attempts: 3,
                initial_backoff: std::time::Duration::from_millis(1),
            },
        ));
        Orchestrator::new(config, reporter, downloader, runner)
    }
}

#[tokio::test]
async fn validate_mode_with_missing_baseline_halts_before_any_work() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let missing = harness.root.join("specs/openapi-v1.yaml");

    let stub = ToolStub::new();
    let reporter = Arc::new(Reporter::new(false));
    let orchestrator = harness.orchestrator(
        harness.config(Mode::Validate, vec![missing], ruleset),
        stub.clone(),
        reporter.clone(),
    );

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(!ok);
    assert_eq!(harness.transport.calls(), 0);
    assert_eq!(stub.total_calls(), 0);
    assert_eq!(reporter.warning_count(), 1);
}

#[tokio::test]
async fn mismatched_inputs_short_circuit_before_any_work() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");

    let mut config = harness.config(Mode::Validate, vec![baseline], ruleset);
    config.document_names.push("v2".to_string());

    let stub = ToolStub::new();
    let reporter = Arc::new(Reporter::new(false));
    let orchestrator = harness.orchestrator(config, stub.clone(), reporter.clone());

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(!ok);
    assert_eq!(harness.transport.calls(), 0);
    assert_eq!(stub.total_calls(), 0);
}

#[tokio::test]
async fn validate_mode_lints_and_saves_a_snapshot() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");
    harness.preinstall_spectral();

    let stub = ToolStub::new();
    let reporter = Arc::new(Reporter::new(false));
    let orchestrator = harness.orchestrator(
        harness.config(Mode::Validate, vec![baseline], ruleset),
        stub.clone(),
        reporter.clone(),
    );

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(ok);
    assert_eq!(stub.count_of("lint"), 1);
    assert_eq!(harness.transport.calls(), 0);

    let tools = harness.tools_root();
    assert!(tools.join("reports/spectral-openapi-v1.txt").exists());
    assert!(
        tools
            .join("checksums/spectral-ruleset-checksum.checksum")
            .exists()
    );
    assert!(tools.join("checksums/openapi-v1.checksum").exists());
}

#[tokio::test]
async fn unchanged_second_run_skips_the_lint_phase() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");
    harness.preinstall_spectral();

    let stub = ToolStub::new();

    let first = harness.orchestrator(
        harness.config(Mode::Validate, vec![baseline.clone()], ruleset.clone()),
        stub.clone(),
        Arc::new(Reporter::new(false)),
    );
    assert!(first.execute(&CancellationToken::new()).await.unwrap());
    assert_eq!(stub.count_of("lint"), 1);

    // Unchanged inputs: the prior report is surfaced instead of re-linting.
    let second = harness.orchestrator(
        harness.config(Mode::Validate, vec![baseline.clone()], ruleset.clone()),
        stub.clone(),
        Arc::new(Reporter::new(false)),
    );
    assert!(second.execute(&CancellationToken::new()).await.unwrap());
    assert_eq!(stub.count_of("lint"), 1);

    // Touching the document forces a fresh lint run.
    std::fs::write(&baseline, "openapi: 3.0.0\npaths: {}\n").unwrap();
    let third = harness.orchestrator(
        harness.config(Mode::Validate, vec![baseline], ruleset),
        stub.clone(),
        Arc::new(Reporter::new(false)),
    );
    assert!(third.execute(&CancellationToken::new()).await.unwrap());
    assert_eq!(stub.count_of("lint"), 2);
}

#[tokio::test]
async fn lint_violations_are_warnings_by_default() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");
    harness.preinstall_spectral();

    let stub = ToolStub::with_lint_violations();
    let reporter = Arc::new(Reporter::new(false));
    let orchestrator = harness.orchestrator(
        harness.config(Mode::Validate, vec![baseline], ruleset),
        stub,
        reporter.clone(),
    );

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(ok);
    assert!(reporter.warning_count() >= 1);
}

#[tokio::test]
async fn lint_violations_fail_the_run_when_warnings_are_errors() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");
    harness.preinstall_spectral();

    let mut config = harness.config(Mode::Validate, vec![baseline], ruleset);
    config.warnings_as_errors = true;

    let stub = ToolStub::with_lint_violations();
    let reporter = Arc::new(Reporter::new(true));
    let orchestrator = harness.orchestrator(config, stub, reporter);

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(!ok);
}

#[tokio::test]
async fn generate_mode_overwrites_baselines_with_generated_specs() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n# stale\n");
    harness.preinstall_spectral();
    harness.preinstall_swagger();

    let stub = ToolStub::new();
    let reporter = Arc::new(Reporter::new(false));
    let orchestrator = harness.orchestrator(
        harness.config(Mode::Generate, vec![baseline.clone()], ruleset),
        stub.clone(),
        reporter,
    );

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(ok);
    assert_eq!(stub.count_of("tofile"), 1);
    assert_eq!(stub.count_of("diff"), 0);
    let content = std::fs::read_to_string(&baseline).unwrap();
    assert!(content.contains("generated"));
}

#[tokio::test]
async fn validate_mode_with_compare_reports_drift_as_a_warning() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");
    harness.preinstall_spectral();
    harness.preinstall_swagger();
    harness.preinstall_oasdiff();

    let mut config = harness.config(Mode::Validate, vec![baseline.clone()], ruleset);
    config.compare_code_against_baseline = true;

    let stub = ToolStub::with_drift("GET /pets: response schema changed\n");
    let reporter = Arc::new(Reporter::new(false));
    let orchestrator = harness.orchestrator(config, stub.clone(), reporter.clone());

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(ok);
    assert_eq!(stub.count_of("tofile"), 1);
    assert_eq!(stub.count_of("diff"), 1);
    assert!(reporter.warning_count() >= 1);
    // The baseline is ground truth in validate mode; it is never rewritten.
    assert_eq!(
        std::fs::read_to_string(&baseline).unwrap(),
        "openapi: 3.0.0\n"
    );
}

#[tokio::test]
async fn generate_mode_with_specgen_disabled_skips_generation() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");
    harness.preinstall_spectral();

    let mut config = harness.config(Mode::Generate, vec![baseline.clone()], ruleset);
    config.disable_specgen = true;

    let stub = ToolStub::new();
    let orchestrator = harness.orchestrator(config, stub.clone(), Arc::new(Reporter::new(false)));

    let ok = orchestrator.execute(&CancellationToken::new()).await.unwrap();

    assert!(ok);
    assert_eq!(stub.count_of("tofile"), 0);
    assert_eq!(stub.count_of("lint"), 1);
    assert_eq!(
        std::fs::read_to_string(&baseline).unwrap(),
        "openapi: 3.0.0\n"
    );
}

#[tokio::test]
async fn cancelled_token_propagates_cancellation_out_of_execute() {
    let harness = Harness::new();
    let ruleset = harness.write_ruleset();
    let baseline = harness.write_baseline("openapi-v1.yaml", "openapi: 3.0.0\n");
    // No tools pre-installed: the pipeline must reach for the downloader,
    // which observes the cancelled token before touching the transport.

    let stub = ToolStub::new();
    let orchestrator = harness.orchestrator(
        harness.config(Mode::Validate, vec![baseline], ruleset),
        stub,
        Arc::new(Reporter::new(false)),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator.execute(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(harness.transport.calls(), 0);
}
