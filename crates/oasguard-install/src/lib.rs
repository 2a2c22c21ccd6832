//! Tool installation for oasguard
//!
//! The external tools (Spectral, oasdiff, the swagger CLI) are pinned by
//! version and installed under `<toolsRoot>/<tool>/<version>/`. The installed
//! binary itself acts as the cache: bumping a pinned version changes the
//! install directory and therefore invalidates it. Installations are
//! mutually independent and run concurrently with fail-fast semantics, since
//! every later pipeline step assumes all tools are present.

pub mod descriptor;
pub mod error;
pub mod installer;
pub mod platform;

pub use descriptor::{ArtifactKind, ToolDescriptor};
pub use error::InstallError;
pub use installer::{InstallPolicy, Installer};
pub use platform::{Arch, Os, Platform};
