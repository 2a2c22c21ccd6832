use crate::config::{Profile, RulesetLocator};
use crate::error::EngineError;
use camino::{Utf8Path, Utf8PathBuf};
use oasguard_fetch::Downloader;
use oasguard_utils::ensure_dir_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const RULESET_BASE_URL: &str = "https://raw.githubusercontent.com/gsoft-inc/wl-api-guidelines";
const RULESET_REVISION: &str = "0.8.0";

/// Default ruleset URL for a profile.
#[must_use]
pub fn profile_ruleset_url(profile: Profile) -> String {
    format!(
        "{RULESET_BASE_URL}/{RULESET_REVISION}/.spectral.{}.yaml",
        profile.as_str()
    )
}

/// Resolves the ruleset locator into a local file the lint tool can read.
///
/// Remote rulesets are downloaded before linting so that a flaky network
/// surfaces here, with retries, instead of inside the lint tool. They are
/// re-fetched every run: unlike the version-pinned tool binaries, a ruleset
/// URL can serve new rules under the same name.
///
/// A local ruleset that does not extend anything is copied and extended with
/// the profile's default ruleset, so project-specific rules add to the
/// shared baseline instead of replacing it.
pub struct RulesetManager {
    locator: RulesetLocator,
    downloader: Arc<Downloader>,
    rulesets_dir: Utf8PathBuf,
    profile: Profile,
}

impl RulesetManager {
    #[must_use]
    pub fn new(
        locator: Option<RulesetLocator>,
        profile: Profile,
        downloader: Arc<Downloader>,
        rulesets_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            locator: locator.unwrap_or_else(|| RulesetLocator::Url(profile_ruleset_url(profile))),
            downloader,
            rulesets_dir: rulesets_dir.into(),
            profile,
        }
    }

    /// Produce a local ruleset path, downloading or extending as needed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the download fails, the local ruleset is
    /// unreadable, or its YAML cannot be parsed.
    pub async fn resolve(&self, cancel: &CancellationToken) -> Result<Utf8PathBuf, EngineError> {
        match &self.locator {
            RulesetLocator::Url(url) => self.fetch_remote(url, cancel).await,
            RulesetLocator::LocalPath(path) => self.prepare_local(path).await,
        }
    }

    async fn fetch_remote(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Utf8PathBuf, EngineError> {
        ensure_dir_all(&self.rulesets_dir)
            .map_err(|source| EngineError::io(self.rulesets_dir.clone(), source))?;

        let file_name = url.rsplit('/').next().unwrap_or(".spectral.yaml");
        let dest = self.rulesets_dir.join(file_name);

        // Stale rules under the same name must not win over fresh ones.
        if dest.exists() {
            tokio::fs::remove_file(&dest)
                .await
                .map_err(|source| EngineError::io(dest.clone(), source))?;
        }

        debug!(url = %url, dest = %dest, "downloading ruleset");
        self.downloader.download(url, &dest, cancel).await?;
        Ok(dest)
    }

    async fn prepare_local(&self, path: &Utf8Path) -> Result<Utf8PathBuf, EngineError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| EngineError::io(path.to_owned(), source))?;

        if has_extends_key(&content)? {
            return Ok(path.to_owned());
        }

        ensure_dir_all(&self.rulesets_dir)
            .map_err(|source| EngineError::io(self.rulesets_dir.clone(), source))?;

        let file_name = path.file_name().unwrap_or(".spectral.yaml");
        let dest = self.rulesets_dir.join(format!("extended-{file_name}"));
        let extended = format!(
            "extends: [{}]\n{content}",
            profile_ruleset_url(self.profile)
        );

        tokio::fs::write(&dest, extended)
            .await
            .map_err(|source| EngineError::io(dest.clone(), source))?;

        debug!(source = %path, dest = %dest, "extended local ruleset with profile defaults");
        Ok(dest)
    }
}

/// Whether a ruleset document carries a top-level `extends` key.
fn has_extends_key(content: &str) -> Result<bool, EngineError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|err| EngineError::Ruleset {
            details: format!("failed to parse ruleset YAML: {err}"),
        })?;

    Ok(value.get("extends").is_some())
}
