//! SearchEngine: find files and directories by name.

use std::sync::Arc;

use globset::GlobBuilder;
use serde::Deserialize;

use super::error::{FsError, FsResult};
use super::walk::{blocking, glob_set, is_glob, walker};
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Directory to search in (default: workspace root)")]
    #[serde(default = "default_path")]
    pub path: String,
    #[schemars(description = "Case-insensitive name fragment, or a glob such as '*.rs'")]
    pub pattern: String,
    #[schemars(description = "Glob patterns to exclude (e.g. 'node_modules', '*.log')")]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_path() -> String {
    ".".to_string()
}

/// Maximum number of paths to return.
const MAX_RESULTS: usize = 1000;

/// Engine for recursive name search.
pub struct SearchEngine {
    workspace: Arc<Workspace>,
}

impl SearchEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    #[tracing::instrument(skip(self, params), name = "engine.search")]
    pub async fn execute(&self, params: SearchParams) -> FsResult<String> {
        let pattern = params.pattern.trim().to_string();
        if pattern.is_empty() {
            return Err(FsError::invalid_pattern("pattern must not be empty"));
        }

        let root = self.workspace.resolve(&params.path)?;
        if !root.is_dir() {
            return Err(FsError::not_a_directory(&params.path));
        }

        let name_glob = if is_glob(&pattern) {
            let glob = GlobBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| FsError::invalid_pattern(format!("{pattern}: {e}")))?;
            Some(glob.compile_matcher())
        } else {
            None
        };
        let needle = pattern.to_lowercase();
        let excludes = glob_set(&params.exclude_patterns, false)?;

        let workspace = self.workspace.clone();
        let matches = blocking(move || {
            let mut builder = walker(&root, false);
            if let Some(excludes) = excludes {
                let search_root = root.clone();
                builder.filter_entry(move |entry| {
                    let rel = entry.path().strip_prefix(&search_root).unwrap_or(entry.path());
                    entry.file_name() != ".git"
                        && (rel.as_os_str().is_empty() || !excludes.is_match(rel))
                });
            }

            let mut found = Vec::new();
            for entry in builder.build().flatten() {
                if entry.depth() == 0 {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                let hit = match &name_glob {
                    Some(glob) => {
                        let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                        glob.is_match(&*name) || glob.is_match(rel)
                    }
                    None => name.to_lowercase().contains(&needle),
                };
                if hit {
                    found.push(workspace.display(entry.path()));
                    if found.len() >= MAX_RESULTS {
                        break;
                    }
                }
            }
            Ok(found)
        })
        .await?;

        if matches.is_empty() {
            return Ok("No matches found.".to_string());
        }
        let truncated = if matches.len() >= MAX_RESULTS {
            format!("\n(truncated at {MAX_RESULTS} results)")
        } else {
            String::new()
        };
        Ok(format!("{}{}", matches.join("\n"), truncated))
    }
}
