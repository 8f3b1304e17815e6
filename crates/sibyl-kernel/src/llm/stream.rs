//! Streaming response accumulation.
//!
//! Providers stream `generateContent` responses as a sequence of partial
//! responses. [`StreamAccumulator`] concatenates their text deltas and folds
//! their metadata into an end-of-stream aggregate, which is checked for
//! block signals once the stream is exhausted.
//!
//! ```text
//! chunk ─▶ push() ─┬─▶ text delta ──────────▶ buffer
//!                  ├─▶ metadata ────────────▶ aggregate
//!                  └─▶ safety error ─▶ Blocked (immediate)
//!
//! end ───▶ finish() ─▶ aggregate block/finish reason? ─▶ Blocked
//!                    ─▶ buffer, else aggregate text, else Malformed
//! ```

use super::retry::safety_reason;
use super::wire::{Candidate, GenerateResponse, ResponseContent};
use super::ProviderError;

/// Folds streaming chunks into final text.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buffer: String,
    aggregate: GenerateResponse,
    chunks: usize,
    skipped: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one item from the stream.
    ///
    /// Transport and API errors abort the stream. Chunks that fail to parse
    /// or carry no text are logged and skipped, unless the failure carries a
    /// safety indicator, which is reported as [`ProviderError::Blocked`].
    pub fn push(
        &mut self,
        item: Result<GenerateResponse, ProviderError>,
    ) -> Result<(), ProviderError> {
        self.chunks += 1;
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(ProviderError::Malformed(message)) => {
                if let Some(reason) = safety_reason(&message) {
                    return Err(ProviderError::Blocked { reason });
                }
                tracing::debug!(
                    chunk = self.chunks,
                    error = %message,
                    "Skipping unreadable stream chunk"
                );
                self.skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match chunk_text(&chunk) {
            Ok(Some(text)) => self.buffer.push_str(&text),
            Ok(None) => {
                tracing::debug!(chunk = self.chunks, "Stream chunk carried no text");
                self.skipped += 1;
            }
            Err(message) => {
                if let Some(reason) = safety_reason(&message) {
                    return Err(ProviderError::Blocked { reason });
                }
                tracing::debug!(chunk = self.chunks, error = %message, "Skipping stream chunk");
                self.skipped += 1;
            }
        }

        self.merge(chunk);
        Ok(())
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// End-of-stream aggregate built from every chunk's metadata.
    pub fn aggregate(&self) -> &GenerateResponse {
        &self.aggregate
    }

    /// Finish the stream: check the aggregate for block signals and return
    /// the accumulated text.
    pub fn finish(self) -> Result<String, ProviderError> {
        if let Some(reason) = self.aggregate.block_signal() {
            return Err(ProviderError::Blocked {
                reason: reason.to_string(),
            });
        }

        let ratings = self.aggregate.safety_ratings();
        if !ratings.is_empty() {
            tracing::debug!(?ratings, "Stream safety ratings");
        }

        tracing::debug!(
            chunks = self.chunks,
            skipped = self.skipped,
            chars = self.buffer.len(),
            "Stream complete"
        );

        if !self.buffer.is_empty() {
            return Ok(self.buffer);
        }

        match self.aggregate.first_text() {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(ProviderError::Malformed(
                "empty or non-text response from stream".into(),
            )),
        }
    }

    fn merge(&mut self, chunk: GenerateResponse) {
        if let Some(feedback) = chunk.prompt_feedback {
            let aggregate = self.aggregate.prompt_feedback.get_or_insert_with(Default::default);
            if feedback.block_reason.is_some() {
                aggregate.block_reason = feedback.block_reason;
            }
            aggregate.safety_ratings.extend(feedback.safety_ratings);
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return;
        };
        if self.aggregate.candidates.is_empty() {
            self.aggregate.candidates.push(Candidate::default());
        }
        let target = &mut self.aggregate.candidates[0];
        if let Some(content) = candidate.content {
            target
                .content
                .get_or_insert_with(ResponseContent::default)
                .parts
                .extend(content.parts);
        }
        if candidate.finish_reason.is_some() {
            target.finish_reason = candidate.finish_reason;
        }
        if !candidate.safety_ratings.is_empty() {
            target.safety_ratings = candidate.safety_ratings;
        }
    }
}

/// Extract the text delta from a chunk.
///
/// A chunk that carries a block signal and no text is an extraction error
/// describing the block.
fn chunk_text(chunk: &GenerateResponse) -> Result<Option<String>, String> {
    if let Some(text) = chunk.first_text() {
        return Ok(Some(text));
    }
    if let Some(reason) = chunk.block_reason() {
        return Err(format!("response blocked for safety: block reason {reason}"));
    }
    if let Some(reason) = chunk.blocking_finish_reason() {
        return Err(format!("candidate stopped for safety: finish reason {reason}"));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(json: serde_json::Value) -> GenerateResponse {
        serde_json::from_value(json).unwrap()
    }

    fn accumulate(
        items: Vec<Result<GenerateResponse, ProviderError>>,
    ) -> Result<String, ProviderError> {
        let mut acc = StreamAccumulator::new();
        for item in items {
            acc.push(item)?;
        }
        acc.finish()
    }

    #[test]
    fn test_concatenates_deltas() {
        let text = accumulate(vec![
            Ok(GenerateResponse::from_text("a")),
            Ok(GenerateResponse::from_text("b")),
            Ok(GenerateResponse::from_text("c")),
        ])
        .unwrap();
        assert_eq!(text, "abc");
    }

    #[test]
    fn test_matches_single_response() {
        let single = GenerateResponse::from_text("The quick brown fox");
        let streamed = accumulate(vec![
            Ok(GenerateResponse::from_text("The quick")),
            Ok(GenerateResponse::from_text(" brown")),
            Ok(GenerateResponse::from_text(" fox")),
        ])
        .unwrap();
        assert_eq!(Some(streamed), single.first_text());
    }

    #[test]
    fn test_skips_empty_and_malformed_chunks() {
        let text = accumulate(vec![
            Ok(GenerateResponse::from_text("one")),
            Ok(GenerateResponse::default()),
            Err(ProviderError::Malformed("invalid stream chunk: EOF".into())),
            Ok(GenerateResponse::from_text(" two")),
        ])
        .unwrap();
        assert_eq!(text, "one two");
    }

    #[test]
    fn test_safety_extraction_error_blocks_immediately() {
        let mut acc = StreamAccumulator::new();
        acc.push(Ok(GenerateResponse::from_text("partial"))).unwrap();
        let err = acc
            .push(Ok(chunk(serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]}))))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Blocked { ref reason } if reason == "SAFETY"));
    }

    #[test]
    fn test_aggregate_finish_reason_blocks_after_stream() {
        let err = accumulate(vec![
            Ok(GenerateResponse::from_text("some text")),
            Ok(chunk(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": " more"}]}, "finishReason": "SAFETY"}]
            }))),
        ])
        .unwrap_err();
        assert!(matches!(err, ProviderError::Blocked { ref reason } if reason == "SAFETY"));
    }

    #[test]
    fn test_transport_error_aborts() {
        let err = accumulate(vec![
            Ok(GenerateResponse::from_text("x")),
            Err(ProviderError::Network("connection reset".into())),
        ])
        .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[test]
    fn test_empty_stream_fails() {
        let err = accumulate(vec![Ok(GenerateResponse::default())]).unwrap_err();
        assert_eq!(err.to_string(), "empty or non-text response from stream");
    }

    #[test]
    fn test_aggregate_collects_metadata() {
        let mut acc = StreamAccumulator::new();
        acc.push(Ok(GenerateResponse::from_text("hi"))).unwrap();
        acc.push(Ok(chunk(serde_json::json!({
            "candidates": [{"finishReason": "STOP", "safetyRatings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "probability": "NEGLIGIBLE"}
            ]}]
        }))))
        .unwrap();

        let aggregate = acc.aggregate();
        assert_eq!(aggregate.candidates[0].finish_reason.as_deref(), Some("STOP"));
        assert_eq!(aggregate.first_text().as_deref(), Some("hi"));
        assert_eq!(acc.text(), "hi");
        assert_eq!(acc.finish().unwrap(), "hi");
    }
}
