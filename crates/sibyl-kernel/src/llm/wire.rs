//! `generateContent` request/response shapes.
//!
//! Vertex AI and the Gemini API share the same JSON schema for content
//! generation, so both backends serialize these types directly.

use serde::{Deserialize, Serialize};

use super::safety::{SafetyPolicy, SafetySetting};
use super::{FunctionDeclaration, Message, ToolSet};

/// Block reasons that do not indicate a refusal.
const NON_BLOCKING_REASONS: [&str; 3] = ["BLOCK_REASON_UNSPECIFIED", "UNSPECIFIED", "OTHER"];

/// Finish reasons that mean the provider stopped on policy grounds.
const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// A tool entry on the wire: either search grounding or function
/// declarations, never both in one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireTool {
    GoogleSearch {},
    FunctionDeclarations(Vec<FunctionDeclaration>),
}

/// Normalized generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Message>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

impl GenerateRequest {
    pub fn new(
        contents: Vec<Message>,
        generation_config: GenerationConfig,
        safety: &SafetyPolicy,
        tools: &ToolSet,
    ) -> Self {
        let mut wire_tools = Vec::new();
        if tools.web_search {
            wire_tools.push(WireTool::GoogleSearch {});
        }
        if !tools.functions.is_empty() {
            wire_tools.push(WireTool::FunctionDeclarations(tools.functions.clone()));
        }
        Self {
            contents,
            generation_config,
            safety_settings: safety.settings().to_vec(),
            tools: wire_tools,
        }
    }

    /// Whether search grounding is requested.
    pub fn uses_search(&self) -> bool {
        self.tools
            .iter()
            .any(|t| matches!(t, WireTool::GoogleSearch {}))
    }

    /// Whether function declarations are attached.
    pub fn has_functions(&self) -> bool {
        self.tools
            .iter()
            .any(|t| matches!(t, WireTool::FunctionDeclarations(_)))
    }

    /// Drop all function declarations, keeping search grounding.
    pub fn without_functions(mut self) -> Self {
        self.tools
            .retain(|t| !matches!(t, WireTool::FunctionDeclarations(_)));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRating {
    pub category: String,
    #[serde(default)]
    pub probability: Option<String>,
    #[serde(default)]
    pub blocked: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ResponseContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_ratings: Vec<SafetyRating>,
}

impl Candidate {
    /// Concatenated text parts, `None` when the candidate carries no text.
    pub fn text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let mut parts = content.parts.iter().filter_map(|p| p.text.as_deref()).peekable();
        parts.peek()?;
        Some(parts.collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_ratings: Vec<SafetyRating>,
}

/// A full response or a single streaming chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateResponse {
    /// Build a single-candidate text response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(ResponseContent {
                    parts: vec![ResponsePart {
                        text: Some(text.into()),
                    }],
                    role: Some("model".into()),
                }),
                finish_reason: None,
                safety_ratings: Vec::new(),
            }],
            prompt_feedback: None,
        }
    }

    /// Text of the first candidate.
    pub fn first_text(&self) -> Option<String> {
        self.candidates.first().and_then(Candidate::text)
    }

    /// Response-level block reason, if it indicates a refusal.
    pub fn block_reason(&self) -> Option<&str> {
        let reason = self.prompt_feedback.as_ref()?.block_reason.as_deref()?;
        is_blocking_reason(reason).then_some(reason)
    }

    /// First candidate's finish reason, if it indicates a policy stop.
    pub fn blocking_finish_reason(&self) -> Option<&str> {
        let reason = self.candidates.first()?.finish_reason.as_deref()?;
        BLOCKING_FINISH_REASONS
            .iter()
            .any(|r| r.eq_ignore_ascii_case(reason))
            .then_some(reason)
    }

    /// Block signal from either the prompt feedback or the finish reason.
    pub fn block_signal(&self) -> Option<&str> {
        self.block_reason().or_else(|| self.blocking_finish_reason())
    }

    /// All safety ratings attached to the response.
    pub fn safety_ratings(&self) -> Vec<&SafetyRating> {
        let feedback = self
            .prompt_feedback
            .iter()
            .flat_map(|f| f.safety_ratings.iter());
        let candidates = self.candidates.iter().flat_map(|c| c.safety_ratings.iter());
        feedback.chain(candidates).collect()
    }
}

fn is_blocking_reason(reason: &str) -> bool {
    !reason.trim().is_empty()
        && !NON_BLOCKING_REASONS
            .iter()
            .any(|r| r.eq_ignore_ascii_case(reason.trim()))
}

/// Provider error body: `{"error": {"code": 429, "message": ..., "status": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::config::Provider;
    use crate::llm::safety::HarmBlockThreshold;

    fn config() -> GenerationConfig {
        GenerationConfig {
            temperature: 0.0,
            max_output_tokens: 8192,
        }
    }

    #[test]
    fn test_request_serialization() {
        let policy = SafetyPolicy::for_provider(Provider::Gemini, HarmBlockThreshold::BlockNone);
        let request = GenerateRequest::new(
            vec![Message::user("hi")],
            config(),
            &policy,
            &ToolSet::web_search(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["tools"][0], serde_json::json!({"googleSearch": {}}));
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_request_without_tools_omits_field() {
        let policy = SafetyPolicy::for_provider(Provider::Vertex, HarmBlockThreshold::BlockNone);
        let request =
            GenerateRequest::new(vec![Message::user("hi")], config(), &policy, &ToolSet::none());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(!request.uses_search());
    }

    #[test]
    fn test_without_functions_keeps_search() {
        let policy = SafetyPolicy::for_provider(Provider::Vertex, HarmBlockThreshold::BlockNone);
        let mut tools = ToolSet::web_search();
        tools.functions.push(FunctionDeclaration {
            name: "f".into(),
            description: "d".into(),
            parameters: None,
        });
        let request = GenerateRequest::new(vec![], config(), &policy, &tools);
        assert!(request.has_functions());

        let request = request.without_functions();
        assert!(!request.has_functions());
        assert!(request.uses_search());
    }

    #[test]
    fn test_response_text_and_block_signals() {
        let json = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }],
            "promptFeedback": {"blockReason": "BLOCK_REASON_UNSPECIFIED"}
        });
        let response: GenerateResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.first_text().as_deref(), Some("Hello, world"));
        assert_eq!(response.block_signal(), None);

        let blocked: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY", "safetyRatings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "probability": "HIGH", "blocked": true}
            ]}
        }))
        .unwrap();
        assert_eq!(blocked.block_reason(), Some("SAFETY"));
        assert_eq!(blocked.first_text(), None);
        assert_eq!(blocked.safety_ratings().len(), 1);

        let other: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }))
        .unwrap();
        assert_eq!(other.block_reason(), None);

        let finished: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert_eq!(finished.block_signal(), Some("SAFETY"));
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.code, Some(429));
        assert_eq!(envelope.error.status, "RESOURCE_EXHAUSTED");
    }
}
