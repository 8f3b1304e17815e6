//! EditEngine: text-replacement file editing with a unified diff preview.
//!
//! Edits apply in order. Each `old_text` is matched exactly first; failing
//! that, a window of lines is matched ignoring leading and trailing
//! whitespace, and the replacement is re-indented to the matched lines.

use std::sync::Arc;

use serde::Deserialize;

use super::error::{FsError, FsResult};
use super::read::read_text;
use super::workspace::Workspace;
use super::write::write_text;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct EditOperation {
    #[schemars(description = "Text to find (exact, or matching line by line ignoring indentation)")]
    pub old_text: String,
    #[schemars(description = "Replacement text")]
    pub new_text: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct EditParams {
    #[schemars(description = "File path to edit, relative to the workspace root")]
    pub path: String,
    #[schemars(description = "Edits to apply in order")]
    pub edits: Vec<EditOperation>,
    #[schemars(description = "Preview the diff without writing (default: false)")]
    #[serde(default)]
    pub dry_run: bool,
}

/// Engine for editing files via text replacement.
pub struct EditEngine {
    workspace: Arc<Workspace>,
}

impl EditEngine {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Apply the edits and return a unified diff of the change. Nothing is
    /// written if any edit fails to match or `dry_run` is set.
    #[tracing::instrument(skip(self, params), fields(path = %params.path), name = "engine.edit")]
    pub async fn execute(&self, params: EditParams) -> FsResult<String> {
        if params.edits.is_empty() {
            return Err(FsError::invalid_edit("at least one edit is required"));
        }

        let full = self.workspace.resolve(&params.path)?;
        let original = normalize_line_endings(&read_text(&self.workspace, &params.path).await?);
        let modified = apply_edits(&original, &params.edits)?;

        let diff = make_diff(&original, &modified, &params.path);
        if !params.dry_run && modified != original {
            write_text(&full, &params.path, &modified).await?;
            tracing::debug!(edits = params.edits.len(), "Applied edits");
        }

        if diff.is_empty() {
            return Ok(format!("No changes to {}", params.path));
        }
        Ok(format!("```diff\n{diff}```"))
    }
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Apply `edits` to `content` in order.
pub(crate) fn apply_edits(content: &str, edits: &[EditOperation]) -> FsResult<String> {
    let mut content = content.to_string();
    for (index, edit) in edits.iter().enumerate() {
        let old = normalize_line_endings(&edit.old_text);
        let new = normalize_line_endings(&edit.new_text);
        if old.is_empty() {
            return Err(FsError::invalid_edit(format!("edit {}: old_text is empty", index + 1)));
        }

        if content.contains(&old) {
            content = content.replacen(&old, &new, 1);
            continue;
        }

        content = fuzzy_replace(&content, &old, &new).ok_or_else(|| {
            FsError::invalid_edit(format!(
                "edit {}: could not find a match for:\n{}",
                index + 1,
                edit.old_text
            ))
        })?;
    }
    Ok(content)
}

/// Replace the first window of lines equal to `old` modulo surrounding
/// whitespace, re-indenting `new` to the matched block.
fn fuzzy_replace(content: &str, old: &str, new: &str) -> Option<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    let old_lines: Vec<&str> = old.trim_end_matches('\n').split('\n').collect();
    if old_lines.len() > lines.len() {
        return None;
    }

    let start = (0..=lines.len() - old_lines.len()).find(|&i| {
        old_lines
            .iter()
            .zip(&lines[i..i + old_lines.len()])
            .all(|(o, l)| o.trim() == l.trim())
    })?;

    let old_base = indentation(old_lines[0]);
    let target_base = indentation(lines[start]);
    let replacement: Vec<String> = new
        .trim_end_matches('\n')
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else if let Some(rest) = line.strip_prefix(old_base) {
                format!("{target_base}{rest}")
            } else {
                format!("{target_base}{}", line.trim_start())
            }
        })
        .collect();

    let mut out: Vec<String> = lines[..start].iter().map(|l| l.to_string()).collect();
    out.extend(replacement);
    out.extend(lines[start + old_lines.len()..].iter().map(|l| l.to_string()));
    Some(out.join("\n"))
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn make_diff(original: &str, modified: &str, path: &str) -> String {
    if original == modified {
        return String::new();
    }
    similar::TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}
