//! Path helpers shared across the workspace

use camino::Utf8Path;

/// Create a directory and all of its parents, tolerating the directory
/// already existing (including benign creation races).
///
/// # Errors
///
/// Returns the underlying I/O error for any failure other than
/// `AlreadyExists`.
pub fn ensure_dir_all(dir: &Utf8Path) -> std::io::Result<()> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

/// File stem of a path (file name without its final extension), or an empty
/// string for paths without a file name.
#[must_use]
pub fn file_stem_of(path: &Utf8Path) -> String {
    path.file_stem().unwrap_or_default().to_string()
}

/// Sanitize an item name for use as a file name.
///
/// Anything outside `[A-Za-z0-9._-]` is replaced with `-` so that document
/// names cannot escape the directory they are keyed under.
#[must_use]
pub fn sanitize_item_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
