//! HTTP plumbing shared by both backends.
//!
//! Non-success responses are parsed into [`ProviderError::Api`] so retry
//! classification can work on status codes rather than message text.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{RequestBuilder, Response};

use super::wire::{ErrorEnvelope, GenerateResponse};
use super::{ProviderError, ResponseStream};

/// Send a prepared request and return the response if it succeeded.
pub(crate) async fn send(builder: RequestBuilder) -> Result<Response, ProviderError> {
    let response = builder.send().await.map_err(transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

/// Decode a single JSON response body.
pub(crate) async fn json_body(response: Response) -> Result<GenerateResponse, ProviderError> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::Malformed(format!("invalid response body: {e}")))
}

/// Turn an `alt=sse` response into a stream of response chunks.
///
/// A chunk carrying an `error` object ends the stream with that error; a
/// chunk that fails to parse is passed through as `Malformed` so the
/// accumulator can log and skip it.
pub(crate) fn sse_chunks(response: Response) -> ResponseStream {
    response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    return Some(Err(ProviderError::Network(format!("SSE stream error: {e}"))));
                }
            };
            let data = event.data.trim();
            if data.is_empty() || data == "[DONE]" {
                return None;
            }
            tracing::trace!(data, "SSE chunk");
            if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(data) {
                let error = envelope.error;
                return Some(Err(ProviderError::Api {
                    status: error.code.unwrap_or(500),
                    code: error.status,
                    message: error.message,
                }));
            }
            Some(
                serde_json::from_str::<GenerateResponse>(data)
                    .map_err(|e| ProviderError::Malformed(format!("invalid stream chunk: {e}"))),
            )
        })
        .boxed()
}

/// Parse a provider error body, falling back to the raw text.
pub(crate) fn api_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ProviderError::Api {
            status,
            code: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => ProviderError::Api {
            status,
            code: String::new(),
            message: body.trim().chars().take(500).collect(),
        },
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Network(format!("timeout: {e}"))
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// One-shot HTTP/1.1 server for exercising the backends without a network.
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Client that ignores proxy settings from the environment.
    pub(crate) fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("build test client")
    }

    /// Answer one request with `status` and `body`. The handle yields the raw
    /// request text (request line, headers and body).
    pub(crate) async fn serve_once(
        status: u16,
        content_type: &str,
        body: &str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind local test server");
        let addr = listener.local_addr().expect("local addr");
        let response = format!(
            "HTTP/1.1 {status} Test\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept connection");
            let request = read_request(&mut socket).await;
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}"), server)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.expect("read request");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            let Some(end) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_server::{client, serve_once};

    #[tokio::test]
    async fn test_send_maps_error_status() {
        let (base, server) = serve_once(
            429,
            "application/json",
            r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#,
        )
        .await;

        let err = send(client().post(format!("{base}/v1/models/m:generateContent")))
            .await
            .unwrap_err();
        match err {
            ProviderError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 429);
                assert_eq!(code, "RESOURCE_EXHAUSTED");
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/models/m:generateContent "));
    }

    #[tokio::test]
    async fn test_json_body() {
        let (base, server) = serve_once(
            200,
            "application/json",
            r#"{"candidates": [{"content": {"parts": [{"text": "Hello"}], "role": "model"}, "finishReason": "STOP"}]}"#,
        )
        .await;

        let response = send(client().post(&base)).await.unwrap();
        let body = json_body(response).await.unwrap();
        assert_eq!(body.first_text().as_deref(), Some("Hello"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_json_body_malformed() {
        let (base, server) = serve_once(200, "application/json", "not json").await;

        let response = send(client().post(&base)).await.unwrap();
        let err = json_body(response).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_sse_chunks() {
        let body = concat!(
            "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"Hel\"}]}}]}\n\n",
            "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"lo\"}]}}]}\n\n",
            "data: {truncated\n\n",
            "data: {\"error\": {\"code\": 503, \"message\": \"Backend gone\", \"status\": \"UNAVAILABLE\"}}\n\n",
            "data: [DONE]\n\n",
        );
        let (base, server) = serve_once(200, "text/event-stream", body).await;

        let response = send(client().post(&base)).await.unwrap();
        let items: Vec<_> = sse_chunks(response).collect().await;
        server.await.unwrap();

        assert_eq!(items.len(), 4, "[DONE] is not a chunk: {items:?}");
        assert_eq!(items[0].as_ref().unwrap().first_text().as_deref(), Some("Hel"));
        assert_eq!(items[1].as_ref().unwrap().first_text().as_deref(), Some("lo"));
        assert!(matches!(items[2], Err(ProviderError::Malformed(_))));
        match &items[3] {
            Err(ProviderError::Api {
                status,
                code,
                message,
            }) => {
                assert_eq!(*status, 503);
                assert_eq!(code, "UNAVAILABLE");
                assert_eq!(message, "Backend gone");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sse_error_without_code() {
        let body = "data: {\"error\": {\"message\": \"Something broke\"}}\n\n";
        let (base, server) = serve_once(200, "text/event-stream", body).await;

        let response = send(client().post(&base)).await.unwrap();
        let items: Vec<_> = sse_chunks(response).collect().await;
        server.await.unwrap();

        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(ProviderError::Api { status: 500, .. })
        ));
    }

    #[test]
    fn test_api_error_parses_envelope() {
        let err = api_error(
            503,
            r#"{"error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}}"#,
        );
        match err {
            ProviderError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 503);
                assert_eq!(code, "UNAVAILABLE");
                assert_eq!(message, "The model is overloaded.");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_api_error_raw_body() {
        let err = api_error(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502 : <html>Bad Gateway</html>");
    }
}
