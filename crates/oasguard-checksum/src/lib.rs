//! Content-hash snapshot store for oasguard
//!
//! Lint runs are expensive; this crate decides whether the tracked inputs
//! (ruleset plus contract documents) have changed since the last successful
//! run, without invoking any tool. One record per tracked item is persisted
//! as `<item>.checksum` in a snapshot directory; records hold the
//! hex-encoded BLAKE3 digest of the file's bytes and are compared
//! case-insensitively.
//!
//! The store is deliberately dependency-free beyond hashing and file I/O:
//! no subprocesses, no network.

use camino::{Utf8Path, Utf8PathBuf};
use oasguard_utils::{file_stem_of, sanitize_item_name};
use thiserror::Error;
use tracing::debug;

/// Fixed item name under which the ruleset digest is recorded.
const RULESET_ITEM: &str = "spectral-ruleset-checksum";

/// Extension of individual snapshot records.
const CHECKSUM_EXTENSION: &str = "checksum";

/// Errors raised by the snapshot store.
#[derive(Error, Debug)]
pub enum ChecksumError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot store keyed by sanitized item names.
///
/// Absence of a record is always treated as "changed" — never as
/// "unchanged" — so a wiped snapshot directory or a brand-new document
/// forces a re-run instead of silently reusing a stale report.
#[derive(Debug, Clone)]
pub struct ChecksumStore {
    dir: Utf8PathBuf,
}

impl ChecksumStore {
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshot records.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Whether the ruleset differs from the recorded snapshot.
    ///
    /// A missing ruleset file or a missing record both report "changed".
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError`] for I/O failures other than the file being
    /// absent.
    pub async fn has_ruleset_changed(&self, ruleset: &Utf8Path) -> Result<bool, ChecksumError> {
        let recorded = self.recorded_digest(RULESET_ITEM).await?;
        let current = file_digest(ruleset).await?;
        Ok(digests_differ(&recorded, &current))
    }

    /// Whether any tracked document differs from the recorded snapshot.
    ///
    /// A document whose record is absent, whose file is missing, or whose
    /// bytes differ reports "changed". A snapshot whose document-record
    /// count differs from the tracked set also reports "changed", so
    /// removing a document from the tracked set does not reuse a stale
    /// report.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError`] for I/O failures other than missing files.
    pub async fn has_any_document_changed(
        &self,
        documents: &[Utf8PathBuf],
    ) -> Result<bool, ChecksumError> {
        for document in documents {
            let item = document_item_name(document);
            let recorded = self.recorded_digest(&item).await?;
            let current = file_digest(document).await?;
            if digests_differ(&recorded, &current) {
                debug!(document = %document, "document changed since last snapshot");
                return Ok(true);
            }
        }

        let recorded_documents = self.count_document_records().await?;
        if recorded_documents != documents.len() {
            debug!(
                recorded = recorded_documents,
                tracked = documents.len(),
                "tracked document set changed size since last snapshot"
            );
            return Ok(true);
        }

        Ok(false)
    }

    /// Persist the digests of the current execution, replacing any prior
    /// snapshot.
    ///
    /// The snapshot directory is wiped and recreated before writing so that
    /// items removed from the tracked set never leave orphaned records.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError`] if the directory cannot be replaced or a
    /// record cannot be written.
    pub async fn save_snapshot(
        &self,
        ruleset: &Utf8Path,
        documents: &[Utf8PathBuf],
    ) -> Result<(), ChecksumError> {
        if self.dir.exists() {
            tokio::fs::remove_dir_all(&self.dir)
                .await
                .map_err(|source| self.io_error(&self.dir, source))?;
        }
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| self.io_error(&self.dir, source))?;

        let ruleset_digest = file_digest(ruleset).await?;
        self.write_record(RULESET_ITEM, &ruleset_digest).await?;

        for document in documents {
            let digest = file_digest(document).await?;
            self.write_record(&document_item_name(document), &digest)
                .await?;
        }

        debug!(dir = %self.dir, documents = documents.len(), "snapshot saved");
        Ok(())
    }

    fn record_path(&self, item: &str) -> Utf8PathBuf {
        self.dir.join(format!("{item}.{CHECKSUM_EXTENSION}"))
    }

    async fn recorded_digest(&self, item: &str) -> Result<String, ChecksumError> {
        let path = self.record_path(item);
        match tokio::fs::read_to_string(&path).await {
            Ok(digest) => Ok(digest.trim().to_string()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(self.io_error(&path, source)),
        }
    }

    async fn write_record(&self, item: &str, digest: &str) -> Result<(), ChecksumError> {
        let path = self.record_path(item);
        tokio::fs::write(&path, digest)
            .await
            .map_err(|source| self.io_error(&path, source))
    }

    async fn count_document_records(&self) -> Result<usize, ChecksumError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(self.io_error(&self.dir, source)),
        };

        let ruleset_record = format!("{RULESET_ITEM}.{CHECKSUM_EXTENSION}");
        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| self.io_error(&self.dir, source))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(&format!(".{CHECKSUM_EXTENSION}")) && name != ruleset_record {
                count += 1;
            }
        }
        Ok(count)
    }

    fn io_error(&self, path: &Utf8Path, source: std::io::Error) -> ChecksumError {
        ChecksumError::Io {
            path: path.to_owned(),
            source,
        }
    }
}

/// Item name a document is recorded under: its sanitized file stem.
fn document_item_name(document: &Utf8Path) -> String {
    sanitize_item_name(&file_stem_of(document))
}

/// Hex-encoded BLAKE3 digest of a file's bytes.
///
/// A missing file hashes to the empty sentinel, which differs from any real
/// digest by construction.
async fn file_digest(path: &Utf8Path) -> Result<String, ChecksumError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(blake3::hash(&bytes).to_hex().to_string()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(ChecksumError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Compare two digests, treating the empty sentinel as always different.
fn digests_differ(recorded: &str, current: &str) -> bool {
    if recorded.is_empty() || current.is_empty() {
        return true;
    }
    !recorded.eq_ignore_ascii_case(current)
}
