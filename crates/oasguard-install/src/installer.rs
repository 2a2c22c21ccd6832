use crate::descriptor::{ArtifactKind, ToolDescriptor};
use crate::error::InstallError;
use camino::{Utf8Path, Utf8PathBuf};
use futures::future::try_join_all;
use oasguard_fetch::Downloader;
use oasguard_runner::{CommandSpec, ProcessRunner};
use oasguard_utils::ensure_dir_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Retry policy for installs that go through a package manager.
///
/// The attempt count is configurable rather than hardcoded; the downloader's
/// own `RetryPolicy` covers direct artifact downloads.
#[derive(Debug, Clone, Copy)]
pub struct InstallPolicy {
    pub attempts: u32,
}

impl Default for InstallPolicy {
    fn default() -> Self {
        Self { attempts: 2 }
    }
}

/// Installs external tools under the tools root.
///
/// Each install is idempotent: the versioned executable path is checked
/// before any network call, so a warm tools directory costs nothing.
pub struct Installer {
    downloader: Arc<Downloader>,
    runner: Arc<dyn ProcessRunner>,
    tools_root: Utf8PathBuf,
    policy: InstallPolicy,
}

impl Installer {
    #[must_use]
    pub fn new(
        downloader: Arc<Downloader>,
        runner: Arc<dyn ProcessRunner>,
        tools_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self::with_policy(downloader, runner, tools_root, InstallPolicy::default())
    }

    #[must_use]
    pub fn with_policy(
        downloader: Arc<Downloader>,
        runner: Arc<dyn ProcessRunner>,
        tools_root: impl Into<Utf8PathBuf>,
        policy: InstallPolicy,
    ) -> Self {
        Self {
            downloader,
            runner,
            tools_root: tools_root.into(),
            policy,
        }
    }

    /// Install every tool in the batch concurrently.
    ///
    /// The batch fails as soon as any single installation fails, since every
    /// subsequent pipeline step assumes all tools are present.
    ///
    /// # Errors
    ///
    /// Returns the first [`InstallError`] raised by any tool.
    pub async fn install_all(
        &self,
        tools: &[ToolDescriptor],
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, Utf8PathBuf>, InstallError> {
        let installed = try_join_all(tools.iter().map(|tool| async move {
            let path = self.install(tool, cancel).await?;
            Ok::<_, InstallError>((tool.name.clone(), path))
        }))
        .await?;

        info!(tools = installed.len(), "finished installing dependencies");
        Ok(installed.into_iter().collect())
    }

    /// Install a single tool, returning the executable path.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when the download, decompression, or
    /// package-manager install fails.
    pub async fn install(
        &self,
        tool: &ToolDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Utf8PathBuf, InstallError> {
        let install_dir = tool.install_dir(&self.tools_root);
        ensure_dir_all(&install_dir).map_err(|source| InstallError::Io {
            path: install_dir.clone(),
            source,
        })?;

        let executable = tool.executable_path(&self.tools_root);
        if executable.exists() {
            debug!(tool = %tool.name, path = %executable, "already installed");
            return Ok(executable);
        }

        info!(tool = %tool.name, version = %tool.version, "installing");

        match &tool.kind {
            ArtifactKind::Binary => {
                self.download_artifact(tool, &executable, cancel).await?;
            }
            ArtifactKind::TarGz { .. } => {
                let archive = tool.artifact_path(&self.tools_root);
                self.download_artifact(tool, &archive, cancel).await?;
                self.decompress(tool, &archive, &install_dir, cancel).await?;
                if !executable.exists() {
                    return Err(InstallError::ExecutableMissing {
                        tool: tool.name.clone(),
                        path: executable,
                    });
                }
            }
            ArtifactKind::DotnetTool { package, .. } => {
                self.install_dotnet_tool(tool, package, &install_dir, cancel)
                    .await?;
            }
        }

        debug!(tool = %tool.name, path = %executable, "installed");
        Ok(executable)
    }

    async fn download_artifact(
        &self,
        tool: &ToolDescriptor,
        dest: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let Some(url) = tool.download_url.as_deref() else {
            return Ok(());
        };

        self.downloader
            .download(url, dest, cancel)
            .await
            .map_err(|source| InstallError::Download {
                tool: tool.name.clone(),
                source,
            })
    }

    async fn decompress(
        &self,
        tool: &ToolDescriptor,
        archive: &Utf8Path,
        install_dir: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let cmd = CommandSpec::new("tar").args([
            "-xzf",
            archive.as_str(),
            "-C",
            install_dir.as_str(),
        ]);

        let output = self
            .runner
            .run(&cmd, cancel)
            .await
            .map_err(|source| InstallError::Runner {
                tool: tool.name.clone(),
                source,
            })?;

        if !output.success() {
            return Err(InstallError::Decompress {
                archive: archive.to_owned(),
                details: output.stderr_string(),
            });
        }

        Ok(())
    }

    async fn install_dotnet_tool(
        &self,
        tool: &ToolDescriptor,
        package: &str,
        install_dir: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            let cmd = CommandSpec::new("dotnet").args([
                "tool",
                "update",
                package,
                "--tool-path",
                install_dir.as_str(),
                "--version",
                tool.version.as_str(),
            ]);

            let output = self
                .runner
                .run(&cmd, cancel)
                .await
                .map_err(|source| InstallError::Runner {
                    tool: tool.name.clone(),
                    source,
                })?;

            if output.success() {
                return Ok(());
            }

            if attempt < attempts {
                warn!(
                    tool = %tool.name,
                    attempt,
                    "tool install failed, retrying"
                );
            } else {
                return Err(InstallError::ToolInstall {
                    tool: tool.name.clone(),
                    attempts,
                    details: output.stderr_string(),
                });
            }
        }

        Ok(())
    }
}
