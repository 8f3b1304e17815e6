//! Workspace root and path sandboxing.
//!
//! Every file tool resolves its paths through [`Workspace::resolve`], so no
//! tool can touch anything outside the root.

use std::path::{Component, Path, PathBuf};

use super::error::{FsError, FsResult};

/// A directory tree the file tools are confined to.
///
/// All paths are relative to `root`. For example, if `root` is
/// `/home/amy/project`, then `resolve("src/main.rs")` yields
/// `/home/amy/project/src/main.rs`. A leading `/` is treated as the root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`.
    ///
    /// The root is canonicalized here so symlinked roots (e.g. macOS
    /// `/tmp` → `/private/tmp`) compare correctly later.
    pub fn new(root: impl AsRef<Path>) -> FsResult<Self> {
        let root = root.as_ref();
        let display = root.display().to_string();
        let root = dunce::canonicalize(root).map_err(|e| FsError::io(e, &display))?;
        if !root.is_dir() {
            return Err(FsError::not_a_directory(display));
        }
        Ok(Self { root })
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace path to an absolute path within the root.
    ///
    /// The target need not exist. `..` that climbs above the root, and
    /// symlinks that point outside it, are rejected.
    pub fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        let relative = normalize(path)?;
        if relative.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        let full = self.root.join(&relative);

        // Canonicalize the deepest existing ancestor; the rest is appended.
        let mut existing = full.as_path();
        let mut missing = Vec::new();
        while std::fs::symlink_metadata(existing).is_err() {
            let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                return Err(FsError::invalid_path(path));
            };
            missing.push(name.to_os_string());
            existing = parent;
        }

        let mut canonical = dunce::canonicalize(existing).map_err(|e| FsError::io(e, path))?;
        for name in missing.into_iter().rev() {
            canonical.push(name);
        }

        if !canonical.starts_with(&self.root) {
            return Err(FsError::path_escapes_root(format!(
                "{} is not under {}",
                path,
                self.root.display()
            )));
        }

        Ok(canonical)
    }

    /// Resolve a path without following a symlink in its final component.
    ///
    /// The parent directory is resolved and checked like [`Self::resolve`];
    /// the last name is appended as-is. Operations on the entry itself (move,
    /// metadata) use this so they act on a link rather than its target.
    pub fn resolve_entry(&self, path: &str) -> FsResult<PathBuf> {
        let relative = normalize(path)?;
        let (Some(parent), Some(name)) = (relative.parent(), relative.file_name()) else {
            return Ok(self.root.clone());
        };
        let parent = self.resolve(&parent.to_string_lossy())?;
        Ok(parent.join(name))
    }

    /// Path relative to the root for display. Falls back to the full path.
    pub fn display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Lexically normalize a workspace path, rejecting `..` above the root.
fn normalize(path: &str) -> FsResult<PathBuf> {
    if path.contains('\0') {
        return Err(FsError::invalid_path("path contains a NUL byte"));
    }

    let mut out = PathBuf::new();
    for component in Path::new(path.trim()).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(FsError::path_escapes_root(path));
                }
            }
            Component::Prefix(_) => return Err(FsError::invalid_path(path)),
        }
    }
    Ok(out)
}
