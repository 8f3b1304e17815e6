//! File tool error types.

use std::io;
use thiserror::Error;

/// File tool error type.
#[derive(Debug, Error)]
pub enum FsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Path escapes the workspace root (security violation).
    #[error("path escapes workspace root: {0}")]
    PathEscapesRoot(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Invalid regex or glob.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// An edit could not be applied.
    #[error("edit failed: {0}")]
    InvalidEdit(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn invalid_edit(msg: impl Into<String>) -> Self {
        Self::InvalidEdit(msg.into())
    }

    /// Map an I/O error on `path` to the matching variant.
    pub fn io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path.to_string()),
            io::ErrorKind::IsADirectory => Self::IsADirectory(path.to_string()),
            _ => Self::Io(err),
        }
    }

    /// Whether the caller supplied bad input, as opposed to the operation
    /// failing on the filesystem.
    pub fn is_invalid_params(&self) -> bool {
        matches!(
            self,
            Self::PathEscapesRoot(_)
                | Self::InvalidPath(_)
                | Self::InvalidPattern(_)
                | Self::InvalidEdit(_)
        )
    }

    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotADirectory(_) => "not_a_directory",
            Self::IsADirectory(_) => "is_a_directory",
            Self::PathEscapesRoot(_) => "path_escapes_root",
            Self::InvalidPath(_) => "invalid_path",
            Self::InvalidPattern(_) => "invalid_pattern",
            Self::InvalidEdit(_) => "invalid_edit",
            Self::Io(_) => "io_error",
        }
    }
}

/// File tool result type.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_mapping() {
        let err = FsError::io(io::Error::from(io::ErrorKind::NotFound), "a.txt");
        assert!(matches!(err, FsError::NotFound(ref p) if p == "a.txt"));

        let err = FsError::io(io::Error::other("disk on fire"), "a.txt");
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn test_invalid_params_split() {
        assert!(FsError::path_escapes_root("../x").is_invalid_params());
        assert!(FsError::invalid_edit("no match").is_invalid_params());
        assert!(!FsError::not_found("x").is_invalid_params());
    }
}
