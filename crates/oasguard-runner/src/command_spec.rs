use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command as TokioCommand;

/// Specification for a command to execute.
///
/// Arguments are stored as `Vec<OsString>` and passed to the child process
/// as discrete elements; no shell evaluation (`sh -c`, `cmd /C`) ever takes
/// place. The optional environment map is an overlay on top of the inherited
/// environment, matching how build pipelines pass tool-specific settings.
///
/// # Example
///
/// ```rust
/// use oasguard_runner::CommandSpec;
///
/// let cmd = CommandSpec::new("spectral")
///     .arg("lint")
///     .arg("openapi-v1.yaml")
///     .args(["--ruleset", ".spectral.yaml"])
///     .cwd("/build");
///
/// assert_eq!(cmd.args.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (not shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides, applied on top of the inherited
    /// environment
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set one environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables for the child process.
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let env_map = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in envs {
            env_map.insert(key.into(), value.into());
        }
        self
    }

    /// Convert into a `tokio::process::Command` ready to spawn.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }

    /// Program name as a lossy string, for diagnostics.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_spec_is_empty() {
        let cmd = CommandSpec::new("spectral");
        assert_eq!(cmd.program, OsString::from("spectral"));
        assert!(cmd.args.is_empty());
        assert!(cmd.cwd.is_none());
        assert!(cmd.env.is_none());
    }

    #[test]
    fn builder_chain_collects_everything() {
        let cmd = CommandSpec::new("oasdiff")
            .arg("diff")
            .args(["base.yaml", "generated.yaml"])
            .cwd("/build")
            .env("NO_COLOR", "1")
            .envs([("CI", "true")]);

        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/build")));
        assert_eq!(cmd.env.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn shell_metacharacters_are_preserved_literally() {
        let cmd = CommandSpec::new("echo")
            .arg("$(whoami)")
            .arg("a;b|c&d")
            .arg("doc with spaces");

        assert_eq!(cmd.args[0], OsString::from("$(whoami)"));
        assert_eq!(cmd.args[1], OsString::from("a;b|c&d"));
        assert_eq!(cmd.args[2], OsString::from("doc with spaces"));
    }

    #[test]
    fn to_tokio_command_does_not_panic() {
        let cmd = CommandSpec::new("echo").arg("hello").cwd(".");
        let _tokio_cmd = cmd.to_tokio_command();
    }

    #[test]
    fn program_name_is_lossy_string() {
        let cmd = CommandSpec::new("tar");
        assert_eq!(cmd.program_name(), "tar");
    }
}
