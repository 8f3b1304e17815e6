//! Directory walking shared by the search and listing engines.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use super::error::{FsError, FsResult};

/// Walker over `root`, sorted by name. `.git` is always skipped.
///
/// With `respect_ignore`, `.gitignore`/`.ignore` rules apply (outside a git
/// repository as well). Hidden files are included either way.
pub(crate) fn walker(root: &Path, respect_ignore: bool) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(respect_ignore)
        .hidden(false)
        .require_git(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| entry.file_name() != ".git");
    builder
}

/// Compile glob patterns into one set. Patterns without a `/` match at any
/// depth.
pub(crate) fn glob_set(patterns: &[String], case_insensitive: bool) -> FsResult<Option<GlobSet>> {
    let patterns: Vec<&str> = patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let anchored = if pattern.contains('/') {
            pattern.trim_start_matches('/').to_string()
        } else {
            format!("**/{pattern}")
        };
        let glob = GlobBuilder::new(&anchored)
            .case_insensitive(case_insensitive)
            .literal_separator(true)
            .build()
            .map_err(|e| FsError::invalid_pattern(format!("{pattern}: {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| FsError::invalid_pattern(e.to_string()))?;
    Ok(Some(set))
}

/// Whether `pattern` uses glob syntax rather than a plain name fragment.
pub(crate) fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Run blocking filesystem work off the async runtime.
pub(crate) async fn blocking<T, F>(work: F) -> FsResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> FsResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| FsError::Io(std::io::Error::other(format!("walk task failed: {e}"))))?
}
