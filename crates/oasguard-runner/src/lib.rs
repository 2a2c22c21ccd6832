//! Process execution for oasguard
//!
//! Every external tool invocation goes through [`CommandSpec`] to guarantee
//! argv-style execution: arguments cross the process boundary as discrete
//! elements, never as shell strings, so document names and paths cannot be
//! interpreted by a shell.
//!
//! The [`ProcessRunner`] trait is the seam the orchestrator is tested
//! through; [`NativeRunner`] is the production implementation on top of
//! `tokio::process`.

pub mod command_spec;
pub mod error;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use process::{NativeRunner, ProcessOutput, ProcessRunner, grant_execute_permission};
