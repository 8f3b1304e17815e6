//! MCP request types for the AI tools.
//!
//! The filesystem tools take the `*Params` structs from
//! [`sibyl_kernel::file_tools`] directly.

use rmcp::schemars;
use serde::Deserialize;

// ============================================================================
// AI Tool Requests
// ============================================================================

/// A free-form question.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryRequest {
    #[schemars(description = "The question to answer")]
    pub query: String,
}

/// A question about a specific technology or library.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TopicQueryRequest {
    /// Technology, library or API the question is about
    #[schemars(description = "Technology, library or API the question is about (e.g. 'tokio', 'React hooks')")]
    pub topic: String,
    #[schemars(description = "What to explain or find snippets for")]
    pub query: String,
}

/// Technologies to write project guidelines for.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GuidelinesRequest {
    #[schemars(description = "Technologies in the project, optionally with versions (e.g. ['Rust 1.85', 'axum'])")]
    pub tech_stack: Vec<String>,
}

// ============================================================================
// Save Variants
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveQueryRequest {
    #[schemars(description = "The question to answer")]
    pub query: String,
    #[schemars(description = "File to write the answer to, relative to the workspace root")]
    pub output_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveTopicQueryRequest {
    #[schemars(description = "Technology, library or API the question is about")]
    pub topic: String,
    #[schemars(description = "What to explain or find snippets for")]
    pub query: String,
    #[schemars(description = "File to write the result to, relative to the workspace root")]
    pub output_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveGuidelinesRequest {
    #[schemars(description = "Technologies in the project, optionally with versions")]
    pub tech_stack: Vec<String>,
    #[schemars(description = "File to write the guidelines to, relative to the workspace root")]
    pub output_path: String,
}
