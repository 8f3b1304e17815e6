//! Vertex AI backend (project/location, OAuth bearer token).
//!
//! Search-grounded calls go through the `v1beta1` surface; plain calls use
//! `v1`. A fixed access token from the configuration is used when present;
//! otherwise tokens come from `gcloud auth print-access-token` and are cached.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::http;
use super::wire::{GenerateRequest, GenerateResponse};
use super::{GenerativeBackend, ProviderError, ResponseStream};

/// Tokens from gcloud live for an hour; refresh well before that.
const TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

const API_VERSION: &str = "v1";
const GROUNDING_API_VERSION: &str = "v1beta1";

struct CachedToken {
    value: String,
    fetched_at: Instant,
}

/// Vertex AI provider.
pub struct VertexBackend {
    client: reqwest::Client,
    project_id: String,
    location: String,
    model: String,
    /// Fixed token from configuration; bypasses the gcloud helper.
    static_token: Option<String>,
    token: RwLock<Option<CachedToken>>,
    host_override: Option<String>,
}

impl std::fmt::Debug for VertexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexBackend")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("model", &self.model)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl VertexBackend {
    /// Create a backend for `model` in `project_id`/`location`.
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id: project_id.into(),
            location: location.into(),
            model: model.into(),
            static_token: None,
            token: RwLock::new(None),
            host_override: None,
        }
    }

    /// Use a fixed access token instead of the gcloud helper.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.static_token = Some(token.into());
        self
    }

    /// Use a preconfigured HTTP client (proxy or timeout settings).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Override the API host (e.g. `http://localhost:8080`).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host_override = Some(host.into());
        self
    }

    fn host(&self) -> String {
        if let Some(host) = &self.host_override {
            return host.clone();
        }
        if self.location == "global" {
            "https://aiplatform.googleapis.com".to_string()
        } else {
            format!("https://{}-aiplatform.googleapis.com", self.location)
        }
    }

    /// Model endpoint. Grounded requests use the grounding-capable surface.
    fn endpoint(&self, method: &str, grounded: bool) -> String {
        let version = if grounded {
            GROUNDING_API_VERSION
        } else {
            API_VERSION
        };
        format!(
            "{}/{}/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.host(),
            version,
            self.project_id,
            self.location,
            self.model,
            method
        )
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.fetched_at.elapsed() < TOKEN_TTL {
                return Ok(cached.value.clone());
            }
        }

        let value = fetch_gcloud_token().await?;
        *self.token.write().await = Some(CachedToken {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    async fn post(
        &self,
        method: &str,
        request: &GenerateRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let token = self.access_token().await?;
        let mut builder = self
            .client
            .post(self.endpoint(method, request.uses_search()))
            .bearer_auth(token)
            .json(request);
        if method == "streamGenerateContent" {
            builder = builder.query(&[("alt", "sse")]);
        }
        http::send(builder).await
    }
}

async fn fetch_gcloud_token() -> Result<String, ProviderError> {
    tracing::debug!("Fetching access token via gcloud");
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| {
            ProviderError::Other(format!("failed to run gcloud for an access token: {e}"))
        })?;

    if !output.status.success() {
        return Err(ProviderError::Other(format!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ProviderError::Other("gcloud returned an empty access token".into()));
    }
    Ok(token)
}

#[async_trait]
impl GenerativeBackend for VertexBackend {
    fn name(&self) -> &str {
        "vertex"
    }

    /// Grounding takes priority: function declarations are dropped when
    /// search is requested.
    fn prepare(&self, request: GenerateRequest) -> GenerateRequest {
        if request.uses_search() && request.has_functions() {
            tracing::warn!(
                provider = "vertex",
                "Search grounding cannot be mixed with function declarations, keeping search only"
            );
            return request.without_functions();
        }
        request
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let response = self.post("generateContent", request).await?;
        http::json_body(response).await
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<ResponseStream, ProviderError> {
        let response = self.post("streamGenerateContent", request).await?;
        Ok(http::sse_chunks(response))
    }
}
