//! oasguard — build-time OpenAPI contract validation orchestrator
//!
//! oasguard coordinates external command-line tools (the Spectral lint
//! engine, the oasdiff diffing engine, a spec generator) to validate or
//! generate API contract documents from a build pipeline. Tool installs run
//! concurrently and are cached by pinned version; lint runs are skipped via
//! content checksums when nothing changed; the whole operation is bounded by
//! a single cancellable deadline.
//!
//! This crate is the CLI surface; the functionality lives in the member
//! crates and is re-exported here for library consumers.

pub mod cli;

pub use oasguard_checksum::{ChecksumError, ChecksumStore};
pub use oasguard_engine::{
    ConfigError, EngineError, Envelope, Mode, Orchestrator, Profile, RulesetLocator, RunConfig,
};
pub use oasguard_fetch::{DownloadError, Downloader, RetryPolicy};
pub use oasguard_install::{InstallError, InstallPolicy, Installer, Platform, ToolDescriptor};
pub use oasguard_runner::{CommandSpec, NativeRunner, ProcessOutput, ProcessRunner, RunnerError};
pub use oasguard_utils::{Reporter, Severity};
