//! InfoEngine: file metadata.

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FsError, FsResult};
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct InfoParams {
    #[schemars(description = "File or directory path, relative to the workspace root")]
    pub path: String,
}

/// Metadata reported for one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
    /// Octal permission bits, e.g. `644`.
    pub permissions: String,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub accessed: Option<String>,
}

/// Engine for reading file metadata.
pub struct InfoEngine {
    workspace: Arc<Workspace>,
}

impl InfoEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Pretty-printed JSON [`FileInfo`].
    pub async fn execute(&self, params: InfoParams) -> FsResult<String> {
        let info = self.info(&params.path).await?;
        serde_json::to_string_pretty(&info).map_err(|e| FsError::Io(std::io::Error::other(e)))
    }

    pub async fn info(&self, path: &str) -> FsResult<FileInfo> {
        let full = self.workspace.resolve_entry(path)?;
        let meta = tokio::fs::symlink_metadata(&full)
            .await
            .map_err(|e| FsError::io(e, path))?;

        let kind = if meta.is_dir() {
            "directory"
        } else if meta.file_type().is_symlink() {
            "symlink"
        } else {
            "file"
        };

        Ok(FileInfo {
            path: self.workspace.display(&full),
            size: meta.len(),
            kind: kind.to_string(),
            permissions: format!("{:o}", meta.permissions().mode() & 0o777),
            created: meta.created().ok().map(rfc3339),
            modified: meta.modified().ok().map(rfc3339),
            accessed: meta.accessed().ok().map(rfc3339),
        })
    }
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
