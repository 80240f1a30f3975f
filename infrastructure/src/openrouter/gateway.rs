//! OpenRouter implementation of the [`CompletionGateway`] port.

use super::sse::{SseFrame, SseLineBuffer, UnframedBody, parse_sse_line};
use super::types::{ChatRequest, ErrorEnvelope};
use async_trait::async_trait;
use cogerphere_application::ports::completion_gateway::{
    CompletionGateway, CompletionRequest, GENERIC_FAILURE_MESSAGE, GatewayError, StreamHandle,
};
use cogerphere_domain::StreamEvent;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Capacity of the event channel between the body reader and the consumer.
const EVENT_BUFFER: usize = 64;

/// Request parameters that do not change between sends.
#[derive(Debug, Clone)]
pub struct OpenRouterSettings {
    pub endpoint: String,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution.
    pub referer: String,
    /// Sent as `X-Title`.
    pub title: String,
    pub temperature: f64,
    pub connect_timeout: Duration,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            referer: "https://github.com/cogerphere/cogerphere".to_string(),
            title: "Cogerphere".to_string(),
            temperature: 0.7,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Streams chat completions from an OpenRouter-compatible endpoint.
pub struct OpenRouterGateway {
    client: reqwest::Client,
    settings: OpenRouterSettings,
}

impl OpenRouterGateway {
    pub fn new(settings: OpenRouterSettings) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl CompletionGateway for OpenRouterGateway {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<StreamHandle, GatewayError> {
        let body = ChatRequest {
            model: &request.config.model,
            messages: &request.turns,
            temperature: self.settings.temperature,
            stream: true,
        };

        debug!(
            endpoint = %self.settings.endpoint,
            model = %request.config.model,
            messages = request.turns.len(),
            "Issuing completion request"
        );

        let send = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(&request.config.api_key)
            .header("HTTP-Referer", &self.settings.referer)
            .header("X-Title", &self.settings.title)
            .json(&body)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = send => result.map_err(|e| GatewayError::ConnectionError(e.to_string()))?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = ErrorEnvelope::message_from(&text)
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            warn!(status = status.as_u16(), message = %message, "Completion request rejected");
            return Err(GatewayError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        info!(status = status.as_u16(), "Completion stream opened");
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(read_body(response, tx, cancel));
        Ok(StreamHandle::new(rx))
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Pump the SSE body into `tx` until a terminal frame, the end of the body,
/// cancellation, or the consumer going away.
async fn read_body(
    response: reqwest::Response,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    let mut body = response.bytes_stream();
    let mut lines = SseLineBuffer::new();
    let mut unframed = UnframedBody::new();
    let mut full_text = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Stream reader cancelled");
                return;
            }
            _ = tx.closed() => return,
            next = body.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                for line in lines.push(&bytes) {
                    unframed.observe(&line);
                    if let Flow::Stop = forward_line(&line, &tx, &mut full_text).await {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "Stream interrupted");
                let _ = tx
                    .send(StreamEvent::Error(format!("Stream interrupted: {}", e)))
                    .await;
                return;
            }
            None => {
                if let Some(line) = lines.finish() {
                    unframed.observe(&line);
                    if let Flow::Stop = forward_line(&line, &tx, &mut full_text).await {
                        return;
                    }
                }
                if let Some(message) = unframed.failure() {
                    warn!(message = %message, "Body ended without any stream data");
                    let _ = tx.send(StreamEvent::Error(message)).await;
                    return;
                }
                debug!("Stream ended without [DONE]");
                let _ = tx.send(StreamEvent::Completed(full_text)).await;
                return;
            }
        }
    }
}

async fn forward_line(
    line: &str,
    tx: &mpsc::Sender<StreamEvent>,
    full_text: &mut String,
) -> Flow {
    match parse_sse_line(line) {
        Ok(SseFrame::Delta(text)) => {
            full_text.push_str(&text);
            if tx.send(StreamEvent::Delta(text)).await.is_err() {
                return Flow::Stop;
            }
            Flow::Continue
        }
        Ok(SseFrame::Done) => {
            let _ = tx
                .send(StreamEvent::Completed(std::mem::take(full_text)))
                .await;
            Flow::Stop
        }
        Ok(SseFrame::Error(message)) => {
            warn!(message = %message, "Error object in stream");
            let _ = tx.send(StreamEvent::Error(message)).await;
            Flow::Stop
        }
        Ok(SseFrame::Ignored) => Flow::Continue,
        Err(e) => {
            debug!(error = %e, "Skipping chunk");
            Flow::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogerphere_domain::{ChatTurn, ProviderConfig, Role};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PATH: &str = "/api/v1/chat/completions";

    fn gateway(server: &MockServer) -> OpenRouterGateway {
        OpenRouterGateway::new(OpenRouterSettings {
            endpoint: format!("{}{}", server.uri(), PATH),
            ..OpenRouterSettings::default()
        })
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            ProviderConfig::new("sk-test", "openai/gpt-4o-mini"),
            vec![ChatTurn::new(Role::User, "hi")],
        )
    }

    fn sse(lines: &[&str]) -> ResponseTemplate {
        let body: String = lines.iter().map(|l| format!("{}\n\n", l)).collect();
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(body)
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {}",
            json!({"choices": [{"index": 0, "delta": {"content": text}}]})
        )
    }

    async fn events(mut handle: StreamHandle) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        while let Some(event) = handle.recv().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn streams_deltas_then_completes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("x-title", "Cogerphere"))
            .and(header("http-referer", "https://github.com/cogerphere/cogerphere"))
            .and(body_partial_json(json!({
                "model": "openai/gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}],
                "temperature": 0.7,
                "stream": true
            })))
            .respond_with(sse(&[
                ": OPENROUTER PROCESSING",
                &delta("Hel"),
                &delta("lo"),
                "data: [DONE]",
            ]))
            .expect(1)
            .mount(&server)
            .await;

        let handle = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(events(handle).await, vec![
            StreamEvent::Delta("Hel".into()),
            StreamEvent::Delta("lo".into()),
            StreamEvent::Completed("Hello".into()),
        ]);
    }

    #[tokio::test]
    async fn unauthorized_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"message": "bad key", "code": 401}})),
            )
            .mount(&server)
            .await;

        let err = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .err()
            .unwrap();

        assert_eq!(err, GatewayError::RequestFailed {
            status: 401,
            message: "bad key".into()
        });
    }

    #[tokio::test]
    async fn error_without_envelope_uses_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .err()
            .unwrap();

        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn malformed_chunks_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(sse(&[
                &delta("a"),
                "data: {truncated",
                "event: ping",
                &delta("b"),
                "data: [DONE]",
            ]))
            .mount(&server)
            .await;

        let handle = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(events(handle).await, vec![
            StreamEvent::Delta("a".into()),
            StreamEvent::Delta("b".into()),
            StreamEvent::Completed("ab".into()),
        ]);
    }

    #[tokio::test]
    async fn body_without_done_completes_with_received_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(sse(&[&delta("partial")]))
            .mount(&server)
            .await;

        let handle = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(events(handle).await, vec![
            StreamEvent::Delta("partial".into()),
            StreamEvent::Completed("partial".into()),
        ]);
    }

    #[tokio::test]
    async fn plain_error_object_with_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": {"message": "No endpoints found", "code": 404}})),
            )
            .mount(&server)
            .await;

        let handle = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(events(handle).await, vec![StreamEvent::Error(
            "No endpoints found".into()
        )]);
    }

    #[tokio::test]
    async fn empty_success_body_fails_with_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(sse(&[": OPENROUTER PROCESSING"]))
            .mount(&server)
            .await;

        let handle = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(events(handle).await, vec![StreamEvent::Error(
            GENERIC_FAILURE_MESSAGE.into()
        )]);
    }

    #[tokio::test]
    async fn in_stream_error_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(sse(&[
                &delta("Hal"),
                r#"data: {"error":{"message":"Provider returned error"}}"#,
                &delta("never"),
            ]))
            .mount(&server)
            .await;

        let handle = gateway(&server)
            .stream_completion(request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(events(handle).await, vec![
            StreamEvent::Delta("Hal".into()),
            StreamEvent::Error("Provider returned error".into()),
        ]);
    }

    #[tokio::test]
    async fn cancel_before_headers_aborts_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(sse(&["data: [DONE]"]).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            gateway.stream_completion(request(), cancel),
        )
        .await
        .expect("cancellation did not abort the request");

        assert!(matches!(result, Err(GatewayError::Cancelled)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connection_error() {
        let gateway = OpenRouterGateway::new(OpenRouterSettings {
            endpoint: "http://127.0.0.1:9/chat/completions".into(),
            connect_timeout: Duration::from_secs(2),
            ..OpenRouterSettings::default()
        })
        .unwrap();

        let err = gateway
            .stream_completion(request(), CancellationToken::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, GatewayError::ConnectionError(_)));
    }
}
