//! Sandboxed filesystem tools.
//!
//! Provides read, write, edit, search, grep, list, tree, move and info
//! engines. Every engine resolves paths through a shared [`Workspace`], which
//! confines them to a single root directory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              MCP tool calls             │
//! └────────────────────┬────────────────────┘
//!                      │ typed Params structs
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         File Tool Engines               │
//! │ (read, write, edit, search, grep, ...)  │
//! └────────────────────┬────────────────────┘
//!                      │
//!            ┌─────────┴──────────┐
//!            ▼                    ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │ Workspace        │  │ walk             │
//! │ (path sandbox)   │  │ (ignore/globset) │
//! └────────┬─────────┘  └────────┬─────────┘
//!          │                     │
//!          ▼                     ▼
//! ┌──────────────────────────────────────────┐
//! │         Local filesystem (tokio::fs)     │
//! └──────────────────────────────────────────┘
//! ```

pub mod edit;
pub mod error;
pub mod grep;
pub mod info;
pub mod list;
pub mod mv;
pub mod read;
pub mod search;
pub mod tree;
pub mod workspace;
pub mod write;

mod walk;

use std::sync::Arc;

pub use edit::{EditEngine, EditOperation, EditParams};
pub use error::{FsError, FsResult};
pub use grep::{GrepEngine, GrepParams};
pub use info::{FileInfo, InfoEngine, InfoParams};
pub use list::{ListEngine, ListParams};
pub use mv::{MoveEngine, MoveParams};
pub use read::{ReadEngine, ReadParams};
pub use search::{SearchEngine, SearchParams};
pub use tree::{NodeKind, TreeEngine, TreeNode, TreeParams};
pub use workspace::Workspace;
pub use write::{FileWrite, WriteEngine, WriteParams};

/// Every file engine over one workspace.
pub struct FileTools {
    workspace: Arc<Workspace>,
    pub read: ReadEngine,
    pub write: WriteEngine,
    pub edit: EditEngine,
    pub search: SearchEngine,
    pub grep: GrepEngine,
    pub list: ListEngine,
    pub tree: TreeEngine,
    pub mv: MoveEngine,
    pub info: InfoEngine,
}

impl FileTools {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            read: ReadEngine::new(workspace.clone()),
            write: WriteEngine::new(workspace.clone()),
            edit: EditEngine::new(workspace.clone()),
            search: SearchEngine::new(workspace.clone()),
            grep: GrepEngine::new(workspace.clone()),
            list: ListEngine::new(workspace.clone()),
            tree: TreeEngine::new(workspace.clone()),
            mv: MoveEngine::new(workspace.clone()),
            info: InfoEngine::new(workspace.clone()),
            workspace,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Write `content` to a single workspace file, creating parents.
    pub async fn save(&self, path: &str, content: &str) -> FsResult<String> {
        self.write
            .execute(WriteParams {
                writes: vec![FileWrite {
                    path: path.to_string(),
                    content: content.to_string(),
                }],
            })
            .await
    }
}

impl std::fmt::Debug for FileTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTools")
            .field("root", &self.workspace.root())
            .finish()
    }
}
