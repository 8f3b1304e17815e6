//! Provider configuration resolved from the process environment.
//!
//! Every tunable falls back to a documented default (with a warning) when
//! absent or malformed. The only fatal condition is a missing credential for
//! the selected provider.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::safety::HarmBlockThreshold;

pub const ENV_PROVIDER: &str = "AI_PROVIDER";
pub const ENV_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const ENV_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_CLOUD_ACCESS_TOKEN";
pub const ENV_VERTEX_MODEL: &str = "VERTEX_MODEL_ID";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL_ID";
pub const ENV_TEMPERATURE: &str = "AI_TEMPERATURE";
pub const ENV_USE_STREAMING: &str = "AI_USE_STREAMING";
pub const ENV_MAX_OUTPUT_TOKENS: &str = "AI_MAX_OUTPUT_TOKENS";
pub const ENV_MAX_RETRIES: &str = "AI_MAX_RETRIES";
pub const ENV_RETRY_DELAY_MS: &str = "AI_RETRY_DELAY_MS";
pub const ENV_SAFETY_THRESHOLD: &str = "AI_SAFETY_THRESHOLD";
pub const ENV_CALL_TIMEOUT_MS: &str = "AI_CALL_TIMEOUT_MS";

pub const DEFAULT_VERTEX_MODEL: &str = "gemini-2.5-pro-exp-03-25";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro-exp-03-25";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_USE_STREAMING: bool = true;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

const MAX_TEMPERATURE: f32 = 2.0;

/// Which backend serves generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Vertex AI: project + region, OAuth bearer token.
    Vertex,
    /// Gemini API: API key.
    Gemini,
}

/// Provider credentials. Exactly one set exists and it always matches
/// [`ProviderConfig::provider`].
#[derive(Clone, PartialEq)]
pub enum Credentials {
    CloudProject {
        project_id: String,
        location: String,
        /// Fixed bearer token; when absent the gcloud helper is used.
        access_token: Option<String>,
    },
    ApiKey { api_key: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CloudProject {
                project_id,
                location,
                access_token,
            } => f
                .debug_struct("CloudProject")
                .field("project_id", project_id)
                .field("location", location)
                .field("access_token", &access_token.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            Self::ApiKey { .. } => f
                .debug_struct("ApiKey")
                .field("api_key", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Fatal configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{provider} provider requires {var} to be set")]
    MissingCredential {
        provider: Provider,
        var: &'static str,
    },
}

/// Immutable per-process generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model_id: String,
    pub temperature: f32,
    pub use_streaming: bool,
    pub max_output_tokens: u32,
    pub max_retries: u32,
    /// Base backoff unit.
    pub retry_delay_ms: u64,
    pub safety_threshold: HarmBlockThreshold,
    /// Per-attempt deadline. `None` leaves attempts unbounded.
    pub call_timeout: Option<Duration>,
    pub credentials: Credentials,
}

impl ProviderConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve_from(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup.
    ///
    /// Pure function of `lookup`: the same snapshot always yields the same
    /// config.
    pub fn resolve_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get(ENV_PROVIDER) {
            None => Provider::Vertex,
            Some(raw) => Provider::from_str(raw.trim()).unwrap_or_else(|_| {
                tracing::warn!(
                    var = ENV_PROVIDER,
                    value = %raw,
                    "Unknown provider, defaulting to vertex"
                );
                Provider::Vertex
            }),
        };

        let (credentials, model_id) = match provider {
            Provider::Vertex => {
                let project_id = get(ENV_PROJECT).ok_or(ConfigError::MissingCredential {
                    provider,
                    var: ENV_PROJECT,
                })?;
                let location = get(ENV_LOCATION).unwrap_or_else(|| DEFAULT_LOCATION.to_string());
                let model =
                    get(ENV_VERTEX_MODEL).unwrap_or_else(|| DEFAULT_VERTEX_MODEL.to_string());
                (
                    Credentials::CloudProject {
                        project_id,
                        location,
                        access_token: get(ENV_ACCESS_TOKEN).map(|t| t.trim().to_string()),
                    },
                    model,
                )
            }
            Provider::Gemini => {
                let api_key = get(ENV_API_KEY).ok_or(ConfigError::MissingCredential {
                    provider,
                    var: ENV_API_KEY,
                })?;
                let model =
                    get(ENV_GEMINI_MODEL).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
                (Credentials::ApiKey { api_key }, model)
            }
        };

        let temperature = parse_or_default(
            get(ENV_TEMPERATURE),
            ENV_TEMPERATURE,
            DEFAULT_TEMPERATURE,
            |t: &f32| (0.0..=MAX_TEMPERATURE).contains(t),
        );
        let use_streaming =
            parse_bool(get(ENV_USE_STREAMING), ENV_USE_STREAMING, DEFAULT_USE_STREAMING);
        let max_output_tokens = parse_or_default(
            get(ENV_MAX_OUTPUT_TOKENS),
            ENV_MAX_OUTPUT_TOKENS,
            DEFAULT_MAX_OUTPUT_TOKENS,
            |n: &u32| *n > 0,
        );
        let max_retries = parse_or_default(
            get(ENV_MAX_RETRIES),
            ENV_MAX_RETRIES,
            DEFAULT_MAX_RETRIES,
            |_| true,
        );
        let retry_delay_ms = parse_or_default(
            get(ENV_RETRY_DELAY_MS),
            ENV_RETRY_DELAY_MS,
            DEFAULT_RETRY_DELAY_MS,
            |_| true,
        );

        let safety_threshold = match get(ENV_SAFETY_THRESHOLD) {
            None => HarmBlockThreshold::default(),
            Some(raw) => HarmBlockThreshold::from_str(raw.trim()).unwrap_or_else(|_| {
                tracing::warn!(
                    var = ENV_SAFETY_THRESHOLD,
                    value = %raw,
                    "Unknown safety threshold, using BLOCK_NONE"
                );
                HarmBlockThreshold::default()
            }),
        };

        let call_timeout = get(ENV_CALL_TIMEOUT_MS).and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
            _ => {
                tracing::warn!(
                    var = ENV_CALL_TIMEOUT_MS,
                    value = %raw,
                    "Invalid call timeout, attempts will be unbounded"
                );
                None
            }
        });

        Ok(Self {
            provider,
            model_id,
            temperature,
            use_streaming,
            max_output_tokens,
            max_retries,
            retry_delay_ms,
            safety_threshold,
            call_timeout,
            credentials,
        })
    }

    /// Total attempts a call may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Parse `raw` as `T`, accepting it only if `valid` holds; otherwise warn and
/// return `default`. Negative integers fail to parse into unsigned types and
/// take the same path.
fn parse_or_default<T>(raw: Option<String>, var: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(var, value = %raw, default = %default, "Invalid value, using default");
            default
        }
    }
}

fn parse_bool(raw: Option<String>, var: &str, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            tracing::warn!(var, value = %raw, default, "Expected true or false, using default");
            default
        }
    }
}
