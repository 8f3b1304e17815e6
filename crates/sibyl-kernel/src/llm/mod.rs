//! Generative-AI call core.
//!
//! Normalizes two Google generative backends behind one interface:
//!
//! - **Vertex AI** (project/location + OAuth bearer token)
//! - **Gemini API** (API key)
//!
//! ```text
//! PromptPlan (history + web search flag)
//!        │
//!        ▼
//! ┌──────────────┐   attempt 0..=max_retries   ┌──────────────────────┐
//! │  Generator   │ ──────────────────────────▶ │ execute / accumulate │
//! │ (retry.rs)   │ ◀── ClassifiedError ─────── │ (execute.rs,         │
//! └──────────────┘                             │  stream.rs)          │
//!                                              └──────────┬───────────┘
//!                                                         ▼
//!                                          dyn GenerativeBackend
//!                                       (VertexBackend | GeminiBackend)
//! ```

mod execute;
mod gemini;
mod http;
mod retry;
mod vertex;

pub mod config;
pub mod safety;
pub mod stream;
pub mod wire;

pub use config::{ConfigError, Credentials, Provider, ProviderConfig};
pub use execute::{execute_non_streaming, execute_streaming};
pub use gemini::GeminiBackend;
pub use retry::{ClassifiedError, Generator, MAX_JITTER_MS, Sleeper, TokioSleeper, classify};
pub use safety::{HarmBlockThreshold, HarmCategory, SafetyPolicy, SafetySetting};
pub use stream::StreamAccumulator;
pub use vertex::VertexBackend;
pub use wire::{GenerateRequest, GenerateResponse};

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human/user message.
    User,
    /// Model message.
    Model,
}

/// A single content part. Only text parts are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// A message in a conversation.
///
/// Serializes directly to the providers' `Content` shape
/// (`{"role": "user", "parts": [{"text": ...}]}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message.
    pub role: Role,
    /// Ordered content parts.
    pub parts: Vec<Part>,
}

impl Message {
    /// Create a user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Create a model message with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Concatenated text of all parts.
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

/// Ordered message history, built fresh for every tool call.
pub type ConversationHistory = Vec<Message>;

/// A structured function declaration.
///
/// Accepted on requests but not used by any tool; the Gemini API path drops
/// them and the Vertex path drops them whenever web search is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Tools attached to a generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSet {
    /// Enable web-search grounding.
    pub web_search: bool,
    /// Structured function declarations.
    pub functions: Vec<FunctionDeclaration>,
}

impl ToolSet {
    /// No tools.
    pub fn none() -> Self {
        Self::default()
    }

    /// Web-search grounding only.
    pub fn web_search() -> Self {
        Self {
            web_search: true,
            functions: Vec::new(),
        }
    }

    /// Number of tool declarations this set produces on the wire.
    pub fn count(&self) -> usize {
        usize::from(self.web_search) + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Raw failure at the provider boundary, before classification.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Non-success HTTP response with the provider's error body.
    #[error("HTTP {status} {code}: {message}")]
    Api {
        status: u16,
        /// Provider status code (e.g. `RESOURCE_EXHAUSTED`), may be empty.
        code: String,
        message: String,
    },

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The attempt exceeded its deadline.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The provider refused generation.
    #[error("response blocked: {reason}")]
    Blocked { reason: String },

    /// Well-formed transport, unexpected payload.
    #[error("{0}")]
    Malformed(String),

    /// Anything else (stub backends, credential helpers).
    #[error("{0}")]
    Other(String),
}

/// Error crossing the core boundary. Only final errors surface here;
/// intermediate attempts are logged.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Malformed caller input.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The provider refused generation on safety/policy grounds.
    #[error("{provider}: content blocked ({reason})")]
    ContentBlocked { provider: String, reason: String },

    /// Every attempt failed with a transient fault.
    #[error("{provider}: failed after {attempts} attempts: {message}")]
    TransientFailureExhausted {
        provider: String,
        attempts: u32,
        message: String,
    },

    /// Unexpected response shape or other non-transient failure.
    #[error("{provider}: {message}")]
    Internal { provider: String, message: String },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParams(_) => "invalid_params",
            Self::ContentBlocked { .. } => "content_blocked",
            Self::TransientFailureExhausted { .. } => "transient_failure_exhausted",
            Self::Internal { .. } => "internal_error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Incremental response chunks from a streaming call.
pub type ResponseStream = BoxStream<'static, Result<GenerateResponse, ProviderError>>;

/// A generative backend: one provider's native call surface.
///
/// Implementations translate the normalized [`GenerateRequest`] into the
/// provider's call shape (`prepare`), and report failures as
/// [`ProviderError`]. Retry, streaming accumulation and block detection are
/// written against this trait only.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Provider name used in logs and errors (e.g. "vertex", "gemini").
    fn name(&self) -> &str;

    /// Apply provider-specific request rules (tool filtering, etc.).
    fn prepare(&self, request: GenerateRequest) -> GenerateRequest {
        request
    }

    /// Single-shot content generation.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError>;

    /// Incremental content generation.
    async fn generate_stream(&self, request: &GenerateRequest)
    -> Result<ResponseStream, ProviderError>;
}

/// Build the backend matching the configured provider.
pub fn backend_for(config: &ProviderConfig) -> Arc<dyn GenerativeBackend> {
    match &config.credentials {
        Credentials::CloudProject {
            project_id,
            location,
            access_token,
        } => {
            let backend = VertexBackend::new(
                project_id.clone(),
                location.clone(),
                config.model_id.clone(),
            );
            match access_token {
                Some(token) => Arc::new(backend.with_access_token(token.clone())),
                None => Arc::new(backend),
            }
        }
        Credentials::ApiKey { api_key } => {
            Arc::new(GeminiBackend::new(api_key.clone(), config.model_id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text(), "hello");

        let model = Message::model("hi there");
        assert_eq!(model.role, Role::Model);
    }

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "parts": [{"text": "hi"}]})
        );
    }

    #[test]
    fn test_tool_set_count() {
        assert_eq!(ToolSet::none().count(), 0);
        assert!(ToolSet::none().is_empty());
        assert_eq!(ToolSet::web_search().count(), 1);

        let mut tools = ToolSet::web_search();
        tools.functions.push(FunctionDeclaration {
            name: "lookup".into(),
            description: "Look something up".into(),
            parameters: None,
        });
        assert_eq!(tools.count(), 2);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(LlmError::Cancelled.kind(), "cancelled");
        let err = LlmError::ContentBlocked {
            provider: "gemini".into(),
            reason: "SAFETY".into(),
        };
        assert_eq!(err.kind(), "content_blocked");
        assert_eq!(err.to_string(), "gemini: content blocked (SAFETY)");
    }
}
