//! Path utilities for configuration values.
//!
//! Config values may use `~` and may be relative to the config file; these
//! helpers turn them into usable paths.

use std::path::{Path, PathBuf};

/// Expands a leading `~` to the home directory.
///
/// Empty (or whitespace-only) input yields an empty path so callers can treat
/// "not configured" uniformly. Relative paths are returned unchanged.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Expands `path` and resolves it against `base_dir` when it is relative.
///
/// Used for paths inside the config file (`apiKeys`, textures), which are
/// relative to the directory holding the config file.
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> PathBuf {
    let expanded = expand(path);

    if expanded.as_os_str().is_empty() || expanded.is_absolute() {
        return expanded;
    }

    base_dir.join(expanded)
}

/// Returns `true` if `path` lies inside `root`.
///
/// Comparison is lexical; neither path needs to exist.
#[must_use]
pub fn is_within(path: &Path, root: &Path) -> bool { path.starts_with(root) }
