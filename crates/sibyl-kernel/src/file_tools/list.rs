//! ListEngine: directory listings.

use std::sync::Arc;

use serde::Deserialize;

use super::error::{FsError, FsResult};
use super::walk::{blocking, walker};
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    #[schemars(description = "Directory to list (default: workspace root)")]
    #[serde(default = "default_path")]
    pub path: String,
    #[schemars(description = "List subdirectories recursively (default: false)")]
    #[serde(default)]
    pub recursive: bool,
}

fn default_path() -> String {
    ".".to_string()
}

/// Engine for listing directory contents.
pub struct ListEngine {
    workspace: Arc<Workspace>,
}

impl ListEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// One `[DIR] name` or `[FILE] name` line per entry, sorted by name.
    /// Recursive listings show paths relative to the listed directory.
    pub async fn execute(&self, params: ListParams) -> FsResult<String> {
        let dir = self.workspace.resolve(&params.path)?;
        let meta = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| FsError::io(e, &params.path))?;
        if !meta.is_dir() {
            return Err(FsError::not_a_directory(&params.path));
        }

        let lines = if params.recursive {
            blocking(move || {
                let mut lines = Vec::new();
                for entry in walker(&dir, false).build().flatten() {
                    if entry.depth() == 0 {
                        continue;
                    }
                    let rel = entry.path().strip_prefix(&dir).unwrap_or(entry.path());
                    let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                    lines.push(format_entry(&rel.to_string_lossy(), is_dir));
                }
                Ok(lines)
            })
            .await?
        } else {
            let mut entries = Vec::new();
            let mut reader = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| FsError::io(e, &params.path))?;
            while let Some(entry) = reader.next_entry().await? {
                let is_dir = entry.file_type().await?.is_dir();
                entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            entries
                .iter()
                .map(|(name, is_dir)| format_entry(name, *is_dir))
                .collect()
        };

        if lines.is_empty() {
            return Ok(format!("{} is empty", params.path));
        }
        Ok(lines.join("\n"))
    }
}

fn format_entry(name: &str, is_dir: bool) -> String {
    if is_dir {
        format!("[DIR] {name}")
    } else {
        format!("[FILE] {name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (ListEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/bin")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "").unwrap();
        std::fs::write(root.join("src/bin/app.rs"), "").unwrap();
        std::fs::write(root.join("Cargo.toml"), "").unwrap();
        let workspace = Arc::new(Workspace::new(root).unwrap());
        (ListEngine::new(workspace), dir)
    }

    #[tokio::test]
    async fn test_flat_listing() {
        let (engine, _dir) = setup();
        let out = engine
            .execute(ListParams {
                path: ".".into(),
                recursive: false,
            })
            .await
            .unwrap();
        assert_eq!(out, "[FILE] Cargo.toml\n[DIR] src");
    }

    #[tokio::test]
    async fn test_recursive_listing() {
        let (engine, _dir) = setup();
        let out = engine
            .execute(ListParams {
                path: "src".into(),
                recursive: true,
            })
            .await
            .unwrap();
        assert_eq!(out, "[DIR] bin\n[FILE] bin/app.rs\n[FILE] lib.rs");
    }

    #[tokio::test]
    async fn test_file_is_not_a_directory() {
        let (engine, _dir) = setup();
        let err = engine
            .execute(ListParams {
                path: "Cargo.toml".into(),
                recursive: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let (engine, _dir) = setup();
        let err = engine
            .execute(ListParams {
                path: "nope".into(),
                recursive: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }
}
