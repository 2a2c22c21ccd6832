use crate::error::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable that disables spec generation in Generate mode.
pub const DISABLE_SPECGEN_ENV: &str = "OASGUARD_DISABLE_SPECGEN";

/// Operating mode, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Produce contract documents from code, optionally diffing against the
    /// tracked baselines instead of overwriting them.
    Generate,
    /// Treat the tracked baseline documents as ground truth, optionally
    /// diffing them against freshly generated documents.
    Validate,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            // "codefirst"/"contractfirst" are legacy aliases kept for older
            // build integrations.
            "generate" | "specgeneration" | "codefirst" => Ok(Self::Generate),
            "validate" | "speccomparison" | "contractfirst" => Ok(Self::Validate),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Validate => write!(f, "validate"),
        }
    }
}

/// Ruleset profile selecting the default ruleset a project lints against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Backend,
    Frontend,
}

impl Profile {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "frontend" => Ok(Self::Frontend),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

/// Where the lint ruleset comes from: a remote URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesetLocator {
    Url(String),
    LocalPath(Utf8PathBuf),
}

impl RulesetLocator {
    /// Classify a locator string. Anything that is not an http(s) URL is a
    /// local path.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::LocalPath(Utf8PathBuf::from(s))
        }
    }
}

/// Inputs for one orchestrator run, resolved once at startup.
///
/// `document_names` and `baseline_paths` are positionally paired: document
/// `i` is generated under its name and compared/linted against baseline `i`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub document_names: Vec<String>,
    pub baseline_paths: Vec<Utf8PathBuf>,
    /// Explicit ruleset locator; `None` selects the profile's default URL.
    pub ruleset: Option<RulesetLocator>,
    pub profile: Profile,
    pub compare_code_against_baseline: bool,
    pub warnings_as_errors: bool,
    pub tools_root: Utf8PathBuf,
    /// Build artifact the spec generator reads the API shape from.
    pub assembly_path: Utf8PathBuf,
    pub working_dir: Utf8PathBuf,
    /// Spec generation kill switch, normally fed from
    /// [`DISABLE_SPECGEN_ENV`].
    pub disable_specgen: bool,
    /// Ceiling for the whole run.
    pub envelope_timeout: Duration,
    /// Tighter bound for a single spec-generation invocation, so one slow
    /// generator cannot starve the remaining budget.
    pub specgen_timeout: Duration,
}

impl RunConfig {
    /// Read the spec generation kill switch from the environment.
    #[must_use]
    pub fn specgen_disabled_from_env() -> bool {
        std::env::var(DISABLE_SPECGEN_ENV)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Eager validation, run before any network or process work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MismatchedInputs`] when document names and
    /// baseline paths do not pair up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document_names.len() != self.baseline_paths.len() {
            return Err(ConfigError::MismatchedInputs {
                documents: self.document_names.len(),
                baselines: self.baseline_paths.len(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn reports_dir(&self) -> Utf8PathBuf {
        self.tools_root.join("reports")
    }

    #[must_use]
    pub fn checksums_dir(&self) -> Utf8PathBuf {
        self.tools_root.join("checksums")
    }

    #[must_use]
    pub fn rulesets_dir(&self) -> Utf8PathBuf {
        self.tools_root.join("rulesets")
    }

    #[must_use]
    pub fn generated_dir(&self) -> Utf8PathBuf {
        self.tools_root.join("generated")
    }

    /// Default ceiling for a run.
    #[must_use]
    pub fn default_envelope_timeout() -> Duration {
        Duration::from_secs(5 * 60)
    }

    /// Default bound for one spec-generation invocation.
    #[must_use]
    pub fn default_specgen_timeout() -> Duration {
        Duration::from_secs(60)
    }

    /// First baseline path that does not exist on disk, if any.
    #[must_use]
    pub fn first_missing_baseline(&self) -> Option<&Utf8Path> {
        self.baseline_paths
            .iter()
            .map(Utf8PathBuf::as_path)
            .find(|path| !path.exists())
    }
}
