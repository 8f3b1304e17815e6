//! Mapping kernel results onto MCP tool results.
//!
//! Malformed input becomes a JSON-RPC `invalid_params` error. Every other
//! failure is a tool result with `is_error` set and the error kind as prefix.

use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use sibyl_kernel::{FsError, FsResult, LlmError};

pub type ToolResult = Result<CallToolResult, McpError>;

pub fn text_result(text: impl Into<String>) -> ToolResult {
    Ok(CallToolResult::success(vec![Content::text(text.into())]))
}

fn failure(kind: &str, message: impl std::fmt::Display) -> ToolResult {
    Ok(CallToolResult::error(vec![Content::text(format!("{kind}: {message}"))]))
}

pub fn llm_failure(err: LlmError) -> ToolResult {
    match err {
        LlmError::InvalidParams(message) => Err(McpError::invalid_params(message, None)),
        other => {
            tracing::warn!(kind = other.kind(), error = %other, "AI tool failed");
            failure(other.kind(), &other)
        }
    }
}

pub fn fs_failure(err: FsError) -> ToolResult {
    if err.is_invalid_params() {
        return Err(McpError::invalid_params(err.to_string(), None));
    }
    tracing::debug!(kind = err.kind(), error = %err, "File tool failed");
    failure(err.kind(), &err)
}

pub fn fs_result(result: FsResult<String>) -> ToolResult {
    match result {
        Ok(text) => text_result(text),
        Err(e) => fs_failure(e),
    }
}
