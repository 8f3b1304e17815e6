//! ReadEngine: read one or more files.

use std::sync::Arc;

use serde::Deserialize;

use super::error::{FsError, FsResult};
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ReadParams {
    /// Files to read, relative to the workspace root.
    #[schemars(description = "One or more file paths, relative to the workspace root")]
    pub paths: Vec<String>,
}

/// Engine for reading file content.
pub struct ReadEngine {
    workspace: Arc<Workspace>,
}

impl ReadEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// A single path returns the file content as-is. Several paths return
    /// each file under a `--- path ---` header, with failures reported in
    /// place of the content.
    #[tracing::instrument(skip(self, params), name = "engine.read")]
    pub async fn execute(&self, params: ReadParams) -> FsResult<String> {
        match params.paths.as_slice() {
            [] => Err(FsError::invalid_path("at least one path is required")),
            [path] => read_text(&self.workspace, path).await,
            paths => {
                let mut sections = Vec::with_capacity(paths.len());
                for path in paths {
                    let body = match read_text(&self.workspace, path).await {
                        Ok(content) => content,
                        Err(e) => format!("Error: {e}"),
                    };
                    sections.push(format!("--- {path} ---\n{body}"));
                }
                Ok(sections.join("\n\n"))
            }
        }
    }
}

/// Read a workspace file as UTF-8 text.
pub(crate) async fn read_text(workspace: &Workspace, path: &str) -> FsResult<String> {
    let full = workspace.resolve(path)?;
    if full.is_dir() {
        return Err(FsError::is_a_directory(path));
    }
    tokio::fs::read_to_string(&full)
        .await
        .map_err(|e| FsError::io(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (ReadEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let workspace = Arc::new(Workspace::new(dir.path()).unwrap());
        (ReadEngine::new(workspace), dir)
    }

    fn params(paths: &[&str]) -> ReadParams {
        ReadParams {
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_single_file_raw() {
        let (engine, dir) = setup();
        std::fs::write(dir.path().join("a.txt"), "alpha\nbeta\n").unwrap();

        let out = engine.execute(params(&["a.txt"])).await.unwrap();
        assert_eq!(out, "alpha\nbeta\n");
    }

    #[tokio::test]
    async fn test_multiple_files_with_inline_errors() {
        let (engine, dir) = setup();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("b.txt"), "beta").unwrap();

        let out = engine
            .execute(params(&["a.txt", "missing.txt", "b.txt"]))
            .await
            .unwrap();
        assert!(out.starts_with("--- a.txt ---\nalpha"));
        assert!(out.contains("--- missing.txt ---\nError: not found: missing.txt"));
        assert!(out.ends_with("--- b.txt ---\nbeta"));
    }

    #[tokio::test]
    async fn test_single_missing_file_fails() {
        let (engine, _dir) = setup();
        let err = engine.execute(params(&["nope.txt"])).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_directory_rejected() {
        let (engine, dir) = setup();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let err = engine.execute(params(&["sub"])).await.unwrap_err();
        assert!(matches!(err, FsError::IsADirectory(_)));
    }

    #[tokio::test]
    async fn test_escape_rejected() {
        let (engine, _dir) = setup();
        let err = engine.execute(params(&["../etc/passwd"])).await.unwrap_err();
        assert!(err.is_invalid_params());
    }

    #[tokio::test]
    async fn test_no_paths() {
        let (engine, _dir) = setup();
        assert!(engine.execute(params(&[])).await.unwrap_err().is_invalid_params());
    }
}
