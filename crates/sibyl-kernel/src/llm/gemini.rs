//! Gemini API backend (API-key authentication).

use async_trait::async_trait;

use super::http;
use super::wire::{GenerateRequest, GenerateResponse};
use super::{GenerativeBackend, ProviderError, ResponseStream};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API provider.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiBackend {
    /// Create a backend for `model` authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a preconfigured HTTP client (proxy or timeout settings).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    /// Function declarations are not supported on this path.
    fn prepare(&self, request: GenerateRequest) -> GenerateRequest {
        if request.has_functions() {
            tracing::warn!(
                provider = "gemini",
                "Function declarations are not supported by the Gemini API path, dropping them"
            );
            return request.without_functions();
        }
        request
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let builder = self
            .client
            .post(self.endpoint("generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        let response = http::send(builder).await?;
        http::json_body(response).await
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<ResponseStream, ProviderError> {
        let builder = self
            .client
            .post(self.endpoint("streamGenerateContent"))
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        let response = http::send(builder).await?;
        Ok(http::sse_chunks(response))
    }
}
