use crate::error::InstallError;

/// Operating system flavor as release artifact schemes name it.
///
/// Alpine is distinct because Spectral ships a musl-linked build; the other
/// tools treat it as plain Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Alpine,
    Macos,
    Windows,
}

/// Processor architecture, restricted to what the pinned tools publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    /// Short name (`x64` / `arm64`).
    #[must_use]
    pub fn short(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }

    /// Name with the `amd` prefix scheme used by Go-style release artifacts
    /// (`amd64` / `arm64`).
    #[must_use]
    pub fn amd_prefixed(self) -> &'static str {
        match self {
            Self::X64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }
}

/// Resolved host platform, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detect the host platform.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::UnsupportedPlatform`] when the host OS or
    /// architecture has no published artifacts for the pinned tools.
    pub fn detect() -> Result<Self, InstallError> {
        let os_release = std::fs::read_to_string("/etc/os-release").unwrap_or_default();
        Self::detect_from(std::env::consts::OS, std::env::consts::ARCH, &os_release)
    }

    /// Detection seam used by tests: takes the raw OS/arch identifiers and
    /// the contents of `/etc/os-release` (empty when absent).
    pub fn detect_from(os: &str, arch: &str, os_release: &str) -> Result<Self, InstallError> {
        let os = match os {
            "linux" if os_release.contains("Alpine Linux") => Os::Alpine,
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            "windows" => Os::Windows,
            other => {
                return Err(InstallError::UnsupportedPlatform(format!(
                    "unknown operating system '{other}'"
                )));
            }
        };

        let arch = match arch {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Arm64,
            other => {
                return Err(InstallError::UnsupportedPlatform(format!(
                    "unknown processor architecture '{other}'"
                )));
            }
        };

        Ok(Self { os, arch })
    }

    #[must_use]
    pub fn is_windows(self) -> bool {
        self.os == Os::Windows
    }
}
