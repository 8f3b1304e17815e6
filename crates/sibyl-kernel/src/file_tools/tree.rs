//! TreeEngine: JSON directory tree.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::{FsError, FsResult};
use super::walk::blocking;
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct TreeParams {
    #[schemars(description = "Directory to start from (default: workspace root)")]
    #[serde(default = "default_path")]
    pub path: String,
    #[schemars(description = "Maximum depth to descend (omit for unlimited)")]
    pub max_depth: Option<usize>,
}

fn default_path() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
}

/// One node of the tree. `children` is present on directories only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

/// Engine for building directory trees.
pub struct TreeEngine {
    workspace: Arc<Workspace>,
}

impl TreeEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Pretty-printed JSON array of the directory's entries.
    pub async fn execute(&self, params: TreeParams) -> FsResult<String> {
        let dir = self.workspace.resolve(&params.path)?;
        if !dir.is_dir() {
            return Err(FsError::not_a_directory(&params.path));
        }
        let max_depth = params.max_depth;
        let label = params.path.clone();
        let tree = blocking(move || children(&dir, 1, max_depth, &label)).await?;
        serde_json::to_string_pretty(&tree)
            .map_err(|e| FsError::Io(std::io::Error::other(e)))
    }
}

fn children(
    dir: &Path,
    depth: usize,
    max_depth: Option<usize>,
    label: &str,
) -> FsResult<Vec<TreeNode>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| FsError::io(e, label))?
        .flatten()
        .filter(|e| e.file_name() != ".git")
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut nodes = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let node = if file_type.is_symlink() {
            TreeNode {
                name,
                kind: NodeKind::Symlink,
                children: None,
            }
        } else if file_type.is_dir() {
            let nested = if max_depth.is_none_or(|max| depth < max) {
                children(&entry.path(), depth + 1, max_depth, label)?
            } else {
                Vec::new()
            };
            TreeNode {
                name,
                kind: NodeKind::Directory,
                children: Some(nested),
            }
        } else {
            TreeNode {
                name,
                kind: NodeKind::File,
                children: None,
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TreeEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("a/b/deep.txt"), "").unwrap();
        std::fs::write(root.join("a/top.txt"), "").unwrap();
        std::fs::write(root.join("root.txt"), "").unwrap();
        let workspace = Arc::new(Workspace::new(root).unwrap());
        (TreeEngine::new(workspace), dir)
    }

    #[tokio::test]
    async fn test_full_tree() {
        let (engine, _dir) = setup();
        let out = engine
            .execute(TreeParams {
                path: ".".into(),
                max_depth: None,
            })
            .await
            .unwrap();
        let tree: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            tree,
            serde_json::json!([
                {"name": "a", "type": "directory", "children": [
                    {"name": "b", "type": "directory", "children": [
                        {"name": "deep.txt", "type": "file"}
                    ]},
                    {"name": "top.txt", "type": "file"}
                ]},
                {"name": "root.txt", "type": "file"}
            ])
        );
    }

    #[tokio::test]
    async fn test_max_depth() {
        let (engine, _dir) = setup();
        let out = engine
            .execute(TreeParams {
                path: ".".into(),
                max_depth: Some(1),
            })
            .await
            .unwrap();
        let tree: Vec<TreeNode> = serde_json::from_str(&out).unwrap();
        assert_eq!(tree[0].name, "a");
        assert_eq!(tree[0].children.as_deref(), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_escape_rejected() {
        let (engine, _dir) = setup();
        let err = engine
            .execute(TreeParams {
                path: "../..".into(),
                max_depth: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_invalid_params());
    }
}
