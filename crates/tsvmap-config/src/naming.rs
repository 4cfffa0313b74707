//! How rule files map to rule set names.

use std::path::Path;

/// Rule set name for a rule file: its file name without extension.
///
/// Taken from the path as given; symlinks are not followed.
pub fn rule_set_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Whether `path` carries `extension` (case-insensitive, leading dot optional).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension.trim_start_matches('.')))
        .unwrap_or(false)
}
