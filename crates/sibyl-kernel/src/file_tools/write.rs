//! WriteEngine: create or overwrite files.

use std::sync::Arc;

use serde::Deserialize;

use super::error::{FsError, FsResult};
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct FileWrite {
    #[schemars(description = "File path to write, relative to the workspace root")]
    pub path: String,
    #[schemars(description = "Full file content to write")]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct WriteParams {
    #[schemars(description = "Files to create or overwrite")]
    pub writes: Vec<FileWrite>,
}

/// Engine for writing/creating files.
pub struct WriteEngine {
    workspace: Arc<Workspace>,
}

impl WriteEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Write every file, creating parent directories. All paths are checked
    /// before anything is written.
    pub async fn execute(&self, params: WriteParams) -> FsResult<String> {
        if params.writes.is_empty() {
            return Err(FsError::invalid_path("at least one write is required"));
        }

        let mut resolved = Vec::with_capacity(params.writes.len());
        for write in &params.writes {
            let full = self.workspace.resolve(&write.path)?;
            if full.is_dir() {
                return Err(FsError::is_a_directory(&write.path));
            }
            resolved.push(full);
        }

        let mut summary = Vec::with_capacity(resolved.len());
        for (write, full) in params.writes.iter().zip(resolved) {
            write_text(&full, &write.path, &write.content).await?;
            tracing::debug!(path = %write.path, bytes = write.content.len(), "Wrote file");
            summary.push(format!("Wrote {} bytes to {}", write.content.len(), write.path));
        }
        Ok(summary.join("\n"))
    }
}

/// Write `content` to an already-resolved path, creating parents.
pub(crate) async fn write_text(full: &std::path::Path, path: &str, content: &str) -> FsResult<()> {
    if let Some(parent) = full.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FsError::io(e, path))?;
    }
    tokio::fs::write(full, content)
        .await
        .map_err(|e| FsError::io(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (WriteEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let workspace = Arc::new(Workspace::new(dir.path()).unwrap());
        (WriteEngine::new(workspace), dir)
    }

    fn write(path: &str, content: &str) -> FileWrite {
        FileWrite {
            path: path.into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let (engine, dir) = setup();
        let out = engine
            .execute(WriteParams {
                writes: vec![write("docs/notes/a.md", "# A\n"), write("b.txt", "bee")],
            })
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("docs/notes/a.md")).unwrap(),
            "# A\n"
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "bee");
        assert!(out.contains("Wrote 4 bytes to docs/notes/a.md"));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (engine, dir) = setup();
        std::fs::write(dir.path().join("a.txt"), "old").unwrap();
        engine
            .execute(WriteParams {
                writes: vec![write("a.txt", "new")],
            })
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_bad_path_writes_nothing() {
        let (engine, dir) = setup();
        let err = engine
            .execute(WriteParams {
                writes: vec![write("ok.txt", "x"), write("../escape.txt", "y")],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::PathEscapesRoot(_)));
        assert!(!dir.path().join("ok.txt").exists());
    }
}
