use crate::platform::{Os, Platform};
use camino::{Utf8Path, Utf8PathBuf};

/// Pinned tool versions.
///
/// Bumping a version changes the versioned install directory, which is what
/// invalidates the on-disk cache for that tool.
const SPECTRAL_VERSION: &str = "6.14.2";
const OASDIFF_VERSION: &str = "1.9.2";
const SWAGGER_CLI_VERSION: &str = "6.5.0";

const SPECTRAL_DOWNLOAD_URL: &str = "https://github.com/stoplightio/spectral/releases/download";
const OASDIFF_DOWNLOAD_URL: &str = "https://github.com/Tufin/oasdiff/releases/download";

/// How a tool's artifact becomes an executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The downloaded artifact is the executable itself.
    Binary,
    /// The artifact is a gzipped tarball containing the executable.
    TarGz { executable: String },
    /// The tool is installed through `dotnet tool update` into the install
    /// directory; there is nothing to download directly.
    DotnetTool {
        package: String,
        executable: String,
    },
}

/// Immutable description of one external tool, resolved once per run.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub version: String,
    /// Platform-specific artifact file name
    pub artifact: String,
    /// Remote location of the artifact (absent for package-manager installs)
    pub download_url: Option<String>,
    pub kind: ArtifactKind,
}

impl ToolDescriptor {
    /// Spectral: a single prebuilt binary per platform.
    #[must_use]
    pub fn spectral(platform: Platform) -> Self {
        let artifact = match platform.os {
            Os::Windows => "spectral.exe".to_string(),
            Os::Linux => format!("spectral-linux-{}", platform.arch.short()),
            Os::Alpine => format!("spectral-alpine-{}", platform.arch.short()),
            Os::Macos => format!("spectral-macos-{}", platform.arch.short()),
        };

        Self {
            name: "spectral".to_string(),
            version: SPECTRAL_VERSION.to_string(),
            download_url: Some(format!(
                "{SPECTRAL_DOWNLOAD_URL}/v{SPECTRAL_VERSION}/{artifact}"
            )),
            artifact,
            kind: ArtifactKind::Binary,
        }
    }

    /// oasdiff: a tar.gz release asset per platform, `darwin_all` on macOS.
    #[must_use]
    pub fn oasdiff(platform: Platform) -> Self {
        let artifact = match platform.os {
            Os::Macos => format!("oasdiff_{OASDIFF_VERSION}_darwin_all.tar.gz"),
            Os::Windows => format!(
                "oasdiff_{OASDIFF_VERSION}_windows_{}.tar.gz",
                platform.arch.amd_prefixed()
            ),
            Os::Linux | Os::Alpine => format!(
                "oasdiff_{OASDIFF_VERSION}_linux_{}.tar.gz",
                platform.arch.amd_prefixed()
            ),
        };

        let executable = if platform.is_windows() {
            "oasdiff.exe"
        } else {
            "oasdiff"
        };

        Self {
            name: "oasdiff".to_string(),
            version: OASDIFF_VERSION.to_string(),
            download_url: Some(format!(
                "{OASDIFF_DOWNLOAD_URL}/v{OASDIFF_VERSION}/{artifact}"
            )),
            artifact,
            kind: ArtifactKind::TarGz {
                executable: executable.to_string(),
            },
        }
    }

    /// The swagger CLI, installed as a .NET tool into its versioned
    /// directory.
    #[must_use]
    pub fn swagger_cli(platform: Platform) -> Self {
        let executable = if platform.is_windows() {
            "swagger.exe"
        } else {
            "swagger"
        };

        Self {
            name: "swagger".to_string(),
            version: SWAGGER_CLI_VERSION.to_string(),
            artifact: executable.to_string(),
            download_url: None,
            kind: ArtifactKind::DotnetTool {
                package: "Swashbuckle.AspNetCore.Cli".to_string(),
                executable: executable.to_string(),
            },
        }
    }

    /// Versioned install directory for this tool.
    #[must_use]
    pub fn install_dir(&self, tools_root: &Utf8Path) -> Utf8PathBuf {
        tools_root.join(&self.name).join(&self.version)
    }

    /// Path of the executable once installed.
    #[must_use]
    pub fn executable_path(&self, tools_root: &Utf8Path) -> Utf8PathBuf {
        let dir = self.install_dir(tools_root);
        match &self.kind {
            ArtifactKind::Binary => dir.join(&self.artifact),
            ArtifactKind::TarGz { executable } | ArtifactKind::DotnetTool { executable, .. } => {
                dir.join(executable)
            }
        }
    }

    /// Path the raw artifact is downloaded to.
    #[must_use]
    pub fn artifact_path(&self, tools_root: &Utf8Path) -> Utf8PathBuf {
        self.install_dir(tools_root).join(&self.artifact)
    }
}
