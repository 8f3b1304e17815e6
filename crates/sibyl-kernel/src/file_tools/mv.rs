//! MoveEngine: move or rename files and directories.

use std::sync::Arc;

use serde::Deserialize;

use super::error::{FsError, FsResult};
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct MoveParams {
    #[schemars(description = "Existing file or directory")]
    pub source: String,
    #[schemars(description = "New location; must not already exist")]
    pub destination: String,
}

/// Engine for moving files within the workspace.
pub struct MoveEngine {
    workspace: Arc<Workspace>,
}

impl MoveEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    pub async fn execute(&self, params: MoveParams) -> FsResult<String> {
        let from = self.workspace.resolve_entry(&params.source)?;
        let to = self.workspace.resolve_entry(&params.destination)?;

        if from == self.workspace.root() {
            return Err(FsError::invalid_path("cannot move the workspace root"));
        }
        if tokio::fs::symlink_metadata(&from).await.is_err() {
            return Err(FsError::not_found(&params.source));
        }
        if tokio::fs::symlink_metadata(&to).await.is_ok() {
            return Err(FsError::already_exists(&params.destination));
        }

        // Ensure parent of destination exists
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::io(e, &params.destination))?;
        }

        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| FsError::io(e, &params.source))?;

        tracing::debug!(source = %params.source, destination = %params.destination, "Moved");
        Ok(format!("Moved {} to {}", params.source, params.destination))
    }
}
