//! Error classification and the retrying generation loop.
//!
//! Every attempt failure is classified into one of three outcomes:
//!
//! | outcome          | retried | final error                  |
//! |------------------|---------|------------------------------|
//! | `Retryable`      | yes     | `TransientFailureExhausted`  |
//! | `Fatal`          | yes     | `Internal`                   |
//! | `ContentBlocked` | no      | `ContentBlocked`             |
//!
//! A safety indicator in any error message marks the call as blocked.
//! Otherwise structured status codes are consulted first, and transient
//! message heuristics apply only to errors that carry no status (credential
//! helpers, stub backends).

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::config::ProviderConfig;
use super::execute::{execute_non_streaming, execute_streaming};
use super::safety::SafetyPolicy;
use super::wire::{GenerateRequest, GenerationConfig};
use super::{ConversationHistory, GenerativeBackend, LlmError, LlmResult, ProviderError, ToolSet};

/// Upper bound (exclusive) of the random jitter added to each backoff.
pub const MAX_JITTER_MS: u64 = 500;

const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
const RETRYABLE_CODES: [&str; 5] = [
    "RESOURCE_EXHAUSTED",
    "UNAVAILABLE",
    "DEADLINE_EXCEEDED",
    "INTERNAL",
    "ABORTED",
];
const SAFETY_INDICATORS: [&str; 4] = ["safety", "blocked", "block reason", "prohibited"];

/// Outcome of classifying a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifiedError {
    /// Transient fault. `token` is the matched status or pattern.
    #[error("retryable: {cause}")]
    Retryable { cause: String, token: Option<String> },

    /// The provider refused generation.
    #[error("content blocked: {reason}")]
    ContentBlocked { reason: String },

    #[error("fatal: {message}")]
    Fatal { message: String },
}

fn transient_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(
            r"(?i)econnreset|connection.?reset|connection.?refused|etimedout|timed.?out|timeout|deadline|\b429\b|\b500\b|\b502\b|\b503\b|\b504\b|unavailable|resource.?exhausted|rate.?limit|too many requests|overloaded|network|socket hang up",
        )
        .expect("transient regex must compile")
    })
}

fn block_reason_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i:block[_ ]?reason|finish[_ ]?reason)\W*([A-Z][A-Z_]{2,})")
            .expect("block reason regex must compile")
    })
}

/// If `message` carries a safety indicator, the block reason it names (or a
/// generic "blocked").
pub(crate) fn safety_reason(message: &str) -> Option<String> {
    let lower = message.to_ascii_lowercase();
    if !SAFETY_INDICATORS.iter().any(|s| lower.contains(s)) {
        return None;
    }
    let reason = block_reason_regex()
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "blocked".to_string());
    Some(reason)
}

fn transient_token(message: &str) -> Option<String> {
    let matched = transient_regex().find(message)?.as_str().to_ascii_lowercase();
    if matched.contains("time") || matched.contains("deadline") {
        Some("timeout".into())
    } else {
        Some(matched)
    }
}

/// Classify a failed attempt.
pub fn classify(error: &ProviderError) -> ClassifiedError {
    match error {
        ProviderError::Blocked { reason } => ClassifiedError::ContentBlocked {
            reason: reason.clone(),
        },
        ProviderError::Timeout(_) => ClassifiedError::Retryable {
            cause: error.to_string(),
            token: Some("timeout".into()),
        },
        ProviderError::Network(message) => match safety_reason(message) {
            Some(reason) => ClassifiedError::ContentBlocked { reason },
            None => ClassifiedError::Retryable {
                cause: error.to_string(),
                token: transient_token(message).or_else(|| Some("network".into())),
            },
        },
        ProviderError::Api {
            status,
            code,
            message,
        } => {
            if let Some(reason) = safety_reason(message) {
                ClassifiedError::ContentBlocked { reason }
            } else if RETRYABLE_STATUSES.contains(status) {
                ClassifiedError::Retryable {
                    cause: error.to_string(),
                    token: Some(status.to_string()),
                }
            } else if RETRYABLE_CODES.iter().any(|c| c.eq_ignore_ascii_case(code)) {
                ClassifiedError::Retryable {
                    cause: error.to_string(),
                    token: Some(code.clone()),
                }
            } else {
                ClassifiedError::Fatal {
                    message: error.to_string(),
                }
            }
        }
        ProviderError::Malformed(message) | ProviderError::Other(message) => {
            if let Some(reason) = safety_reason(message) {
                ClassifiedError::ContentBlocked { reason }
            } else if let Some(token) = transient_token(message) {
                ClassifiedError::Retryable {
                    cause: message.clone(),
                    token: Some(token),
                }
            } else {
                ClassifiedError::Fatal {
                    message: message.clone(),
                }
            }
        }
    }
}

/// Backoff before retrying after `attempt` (0-based):
/// `base * 2^attempt + jitter`.
pub(crate) fn backoff_delay(base_ms: u64, attempt: u32, jitter_ms: u64) -> Duration {
    let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt.min(30)));
    Duration::from_millis(exponential.saturating_add(jitter_ms))
}

fn jitter() -> u64 {
    rand::thread_rng().gen_range(0..MAX_JITTER_MS)
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs generation requests against one backend with retries.
pub struct Generator {
    config: Arc<ProviderConfig>,
    safety: SafetyPolicy,
    backend: Arc<dyn GenerativeBackend>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("provider", &self.backend.name())
            .field("model", &self.config.model_id)
            .finish()
    }
}

impl Generator {
    pub fn new(config: Arc<ProviderConfig>, backend: Arc<dyn GenerativeBackend>) -> Self {
        let safety = SafetyPolicy::for_provider(config.provider, config.safety_threshold);
        Self {
            config,
            safety,
            backend,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.backend.name()
    }

    /// Build the provider request for `history` and `tools`.
    pub fn build_request(&self, history: ConversationHistory, tools: &ToolSet) -> GenerateRequest {
        let request = GenerateRequest::new(
            history,
            GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
            &self.safety,
            tools,
        );
        self.backend.prepare(request)
    }

    /// Generate text for `history`, retrying failed attempts with
    /// exponential backoff.
    ///
    /// Makes at most `max_retries + 1` attempts. Content blocks and
    /// cancellation end the call immediately.
    pub async fn generate(
        &self,
        history: ConversationHistory,
        tools: &ToolSet,
        cancel: &CancellationToken,
    ) -> LlmResult<String> {
        if history.is_empty() {
            return Err(LlmError::InvalidParams("conversation history is empty".into()));
        }
        if history.iter().all(|m| m.text().trim().is_empty()) {
            return Err(LlmError::InvalidParams("conversation history has no text".into()));
        }

        let request = self.build_request(history, tools);
        let provider = self.backend.name();
        let attempts = self.config.max_attempts();
        let mut last = None;

        for attempt in 0..attempts {
            tracing::info!(
                provider,
                model = %self.config.model_id,
                temperature = self.config.temperature,
                grounding = request.uses_search(),
                tool_count = request.tools.len(),
                streaming = self.config.use_streaming,
                attempt,
                "Generating content"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                outcome = self.attempt(&request) => outcome,
            };

            let error = match outcome {
                Ok(text) => {
                    tracing::info!(provider, attempt, chars = text.len(), "Generation succeeded");
                    return Ok(text);
                }
                Err(error) => error,
            };

            let classified = classify(&error);
            if let ClassifiedError::ContentBlocked { reason } = classified {
                tracing::error!(provider, attempt, %reason, "Content blocked");
                return Err(LlmError::ContentBlocked {
                    provider: provider.to_string(),
                    reason,
                });
            }
            tracing::warn!(provider, attempt, %error, outcome = %classified, "Attempt failed");
            last = Some(classified);

            if attempt + 1 < attempts {
                let delay = backoff_delay(self.config.retry_delay_ms, attempt, jitter());
                tracing::debug!(
                    provider,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                    _ = self.sleeper.sleep(delay) => {}
                }
            }
        }

        Err(self.exhausted(attempts, last))
    }

    async fn attempt(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let backend = self.backend.as_ref();
        let call = async {
            if self.config.use_streaming {
                execute_streaming(backend, request).await
            } else {
                execute_non_streaming(backend, request).await
            }
        };
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(ProviderError::Timeout(limit.as_millis() as u64))),
            None => call.await,
        }
    }

    fn exhausted(&self, attempts: u32, last: Option<ClassifiedError>) -> LlmError {
        let provider = self.backend.name().to_string();
        match last {
            Some(ClassifiedError::Retryable { cause, token }) => {
                let message = match token.as_deref() {
                    Some("timeout") => format!("request timed out: {cause}"),
                    Some(token) => format!("transient error ({token}): {cause}"),
                    None => cause,
                };
                tracing::error!(%provider, attempts, %message, "Retries exhausted");
                LlmError::TransientFailureExhausted {
                    provider,
                    attempts,
                    message,
                }
            }
            Some(ClassifiedError::Fatal { message }) => {
                tracing::error!(%provider, attempts, %message, "Generation failed");
                LlmError::Internal {
                    provider,
                    message: format!("failed after {attempts} attempts: {message}"),
                }
            }
            Some(ClassifiedError::ContentBlocked { reason }) => {
                LlmError::ContentBlocked { provider, reason }
            }
            None => LlmError::Internal {
                provider,
                message: "no attempts were made".into(),
            },
        }
    }
}
