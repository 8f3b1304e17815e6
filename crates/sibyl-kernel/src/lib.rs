//! # sibyl-kernel
//!
//! Core crate for sibyl: the generative-AI call core and the sandboxed
//! filesystem tools.
//!
//! - [`llm`] normalizes Vertex AI and the Gemini API behind one backend
//!   trait, with streaming accumulation, safety filtering and retries.
//! - [`prompts`] turns tool arguments into conversations.
//! - [`file_tools`] reads, writes, edits and searches files under a single
//!   workspace root.

pub mod file_tools;
pub mod llm;
pub mod prompts;

pub use file_tools::{FileTools, FsError, FsResult, Workspace};
pub use llm::{
    ConfigError, ConversationHistory, Generator, GenerativeBackend, LlmError, LlmResult, Message,
    Provider, ProviderConfig, ProviderError, ToolSet, backend_for,
};
pub use prompts::PromptPlan;
