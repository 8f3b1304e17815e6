//! GrepEngine: regex search across workspace files.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Deserialize;

use super::error::{FsError, FsResult};
use super::walk::{blocking, glob_set, walker};
use super::workspace::Workspace;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct GrepParams {
    #[schemars(description = "Regex pattern to search for (invalid regexes are searched literally)")]
    pub pattern: String,
    #[schemars(description = "Directory to search in (default: workspace root)")]
    pub path: Option<String>,
    #[schemars(description = "File glob filter (e.g., '*.rs', 'src/**/*.py')")]
    pub glob: Option<String>,
    #[schemars(description = "Number of context lines before/after each match (default: 0)")]
    #[serde(default)]
    pub context_lines: u32,
}

/// Maximum number of matches to return.
const MAX_MATCHES: usize = 200;
/// Maximum file size to search (skip very large files).
const MAX_FILE_SIZE: u64 = 1_000_000;

/// Engine for searching file content with regex.
pub struct GrepEngine {
    workspace: Arc<Workspace>,
}

impl GrepEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    #[tracing::instrument(skip(self, params), name = "engine.grep")]
    pub async fn execute(&self, params: GrepParams) -> FsResult<String> {
        if params.pattern.is_empty() {
            return Err(FsError::invalid_pattern("pattern must not be empty"));
        }
        let re = match regex::Regex::new(&params.pattern) {
            Ok(r) => r,
            // Fall back to literal search
            Err(_) => regex::Regex::new(&regex::escape(&params.pattern))
                .map_err(|e| FsError::invalid_pattern(e.to_string()))?,
        };

        let search_root = self.workspace.resolve(params.path.as_deref().unwrap_or("."))?;
        let filter = match &params.glob {
            Some(glob) => glob_set(std::slice::from_ref(glob), false)?,
            None => None,
        };
        let ctx = params.context_lines as usize;
        let workspace = self.workspace.clone();

        blocking(move || {
            let files: Vec<_> = if search_root.is_file() {
                vec![search_root.clone()]
            } else {
                walker(&search_root, true)
                    .build()
                    .flatten()
                    .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
                    .map(|e| e.into_path())
                    .filter(|path| {
                        let rel = path.strip_prefix(&search_root).unwrap_or(path);
                        filter.as_ref().is_none_or(|set| set.is_match(rel))
                    })
                    .collect()
            };

            let mut output = String::new();
            let mut total_matches = 0;
            let mut files_with_matches = 0;

            for file_path in &files {
                if total_matches >= MAX_MATCHES {
                    break;
                }
                if std::fs::metadata(file_path).map(|m| m.len()).unwrap_or(0) > MAX_FILE_SIZE {
                    continue;
                }
                // Skip binary and unreadable files
                let Ok(content) = std::fs::read_to_string(file_path) else {
                    continue;
                };

                let path_str = workspace.display(file_path);
                let lines: Vec<&str> = content.lines().collect();
                let mut file_matched = false;

                for (line_idx, line) in lines.iter().enumerate() {
                    if total_matches >= MAX_MATCHES {
                        break;
                    }
                    if !re.is_match(line) {
                        continue;
                    }
                    total_matches += 1;
                    file_matched = true;

                    if ctx > 0 {
                        let start = line_idx.saturating_sub(ctx);
                        let end = (line_idx + ctx + 1).min(lines.len());
                        for (i, context_line) in lines.iter().enumerate().take(end).skip(start) {
                            let prefix = if i == line_idx { ">" } else { " " };
                            let _ = writeln!(output, "{prefix}{path_str}:{}:{context_line}", i + 1);
                        }
                        output.push_str("--\n");
                    } else {
                        let _ = writeln!(output, "{path_str}:{}:{line}", line_idx + 1);
                    }
                }
                if file_matched {
                    files_with_matches += 1;
                }
            }

            if total_matches == 0 {
                return Ok("No matches found.".to_string());
            }
            let truncated = if total_matches >= MAX_MATCHES {
                format!(" (truncated at {MAX_MATCHES} matches)")
            } else {
                String::new()
            };
            Ok(format!(
                "{}\n{} match{} in {} file{}{}",
                output.trim_end(),
                total_matches,
                if total_matches == 1 { "" } else { "es" },
                files_with_matches,
                if files_with_matches == 1 { "" } else { "s" },
                truncated
            ))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (GrepEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(
            root.join("src/lib.rs"),
            "fn alpha() {}\nfn beta() {}\nfn gamma() {}\n",
        )
        .unwrap();
        std::fs::write(root.join("notes.txt"), "alpha notes\n").unwrap();
        let workspace = Arc::new(Workspace::new(root).unwrap());
        (GrepEngine::new(workspace), dir)
    }

    fn params(pattern: &str) -> GrepParams {
        GrepParams {
            pattern: pattern.into(),
            path: None,
            glob: None,
            context_lines: 0,
        }
    }

    #[tokio::test]
    async fn test_regex_search() {
        let (engine, _dir) = setup();
        let out = engine.execute(params(r"fn \w+a\(")).await.unwrap();
        assert!(out.contains("src/lib.rs:1:fn alpha() {}"));
        assert!(out.contains("src/lib.rs:2:fn beta() {}"));
        assert!(out.contains("src/lib.rs:3:fn gamma() {}"));
        assert!(out.ends_with("3 matches in 1 file"));
    }

    #[tokio::test]
    async fn test_glob_filter() {
        let (engine, _dir) = setup();
        let mut p = params("alpha");
        p.glob = Some("*.txt".into());
        let out = engine.execute(p).await.unwrap();
        assert!(out.contains("notes.txt:1:alpha notes"));
        assert!(!out.contains("lib.rs"));
    }

    #[tokio::test]
    async fn test_context_lines() {
        let (engine, _dir) = setup();
        let mut p = params("beta");
        p.path = Some("src".into());
        p.context_lines = 1;
        let out = engine.execute(p).await.unwrap();
        assert!(out.contains(" src/lib.rs:1:fn alpha() {}"));
        assert!(out.contains(">src/lib.rs:2:fn beta() {}"));
        assert!(out.contains(" src/lib.rs:3:fn gamma() {}"));
    }

    #[tokio::test]
    async fn test_invalid_regex_falls_back_to_literal() {
        let (engine, dir) = setup();
        std::fs::write(dir.path().join("odd.txt"), "call foo( here\n").unwrap();
        let out = engine.execute(params("foo(")).await.unwrap();
        assert!(out.contains("odd.txt:1:call foo( here"));
    }

    #[tokio::test]
    async fn test_respects_gitignore() {
        let (engine, dir) = setup();
        std::fs::write(dir.path().join(".gitignore"), "ignored/\n").unwrap();
        std::fs::create_dir(dir.path().join("ignored")).unwrap();
        std::fs::write(dir.path().join("ignored/x.txt"), "alpha\n").unwrap();
        let out = engine.execute(params("alpha")).await.unwrap();
        assert!(!out.contains("ignored/x.txt"));
    }

    #[tokio::test]
    async fn test_match_cap() {
        let (engine, dir) = setup();
        let big: String = (0..300).map(|i| format!("needle {i}\n")).collect();
        std::fs::write(dir.path().join("big.txt"), big).unwrap();
        let out = engine.execute(params("needle")).await.unwrap();
        assert!(out.ends_with("200 matches in 1 file (truncated at 200 matches)"));
    }

    #[tokio::test]
    async fn test_no_matches() {
        let (engine, _dir) = setup();
        assert_eq!(engine.execute(params("zeta")).await.unwrap(), "No matches found.");
    }
}
