//! Single-attempt execution against a backend.

use futures::StreamExt;

use super::stream::StreamAccumulator;
use super::wire::GenerateRequest;
use super::{GenerativeBackend, ProviderError};

/// Run one non-streaming call and extract the first candidate's text.
///
/// Block reasons and blocking finish reasons become
/// [`ProviderError::Blocked`]; a response without text is `Malformed`.
pub async fn execute_non_streaming(
    backend: &dyn GenerativeBackend,
    request: &GenerateRequest,
) -> Result<String, ProviderError> {
    let response = backend.generate(request).await?;

    if let Some(reason) = response.block_signal() {
        return Err(ProviderError::Blocked {
            reason: reason.to_string(),
        });
    }

    let ratings = response.safety_ratings();
    if !ratings.is_empty() {
        tracing::debug!(provider = backend.name(), ?ratings, "Safety ratings");
    }

    match response.first_text() {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ProviderError::Malformed(
            "failed to extract response text".into(),
        )),
    }
}

/// Run one streaming call and accumulate its text.
pub async fn execute_streaming(
    backend: &dyn GenerativeBackend,
    request: &GenerateRequest,
) -> Result<String, ProviderError> {
    let mut stream = backend.generate_stream(request).await?;
    let mut accumulator = StreamAccumulator::new();
    while let Some(item) = stream.next().await {
        accumulator.push(item)?;
    }
    accumulator.finish()
}
