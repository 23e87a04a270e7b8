//! HTTP client for the remote review model.
//!
//! Speaks the Anthropic messages API: one `POST {base}/v1/messages` per
//! attempt, bounded retries with a fixed pause, and unwrapping of the
//! model's answer down to the raw review payload. The payload leaves this
//! module as loose JSON; coercion into typed suggestions happens in the
//! service layer.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::review::model::{ReviewRequest, ReviewStyle};
use crate::review::prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Failures raised by the remote review call.
///
/// Every variant is retryable; the client reports the error of the final
/// attempt to its caller.
#[derive(Debug, Error)]
pub enum RemoteReviewError {
    #[error("the remote review API key is not configured")]
    MissingApiKey,

    #[error("{}", http_failure_message(.status, .body))]
    Http { status: u16, body: String },

    #[error("remote review network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("failed to build the remote review HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("the remote review response was not valid JSON: {0}")]
    EnvelopeSyntax(#[source] serde_json::Error),

    #[error("the remote review response has no content")]
    MissingContent,

    #[error("the remote review response carried no text")]
    EmptyContent,

    #[error("the remote review payload was not valid JSON: {0}")]
    PayloadSyntax(#[source] serde_json::Error),

    #[error("the remote review payload is not a JSON object")]
    PayloadShape,

    #[error("the remote review call failed")]
    Exhausted,
}

fn http_failure_message(status: &u16, body: &str) -> String {
    if body.is_empty() {
        format!("remote review call failed with HTTP {status}")
    } else {
        format!("remote review call failed with HTTP {status}: {body}")
    }
}

/// Transport seam under the retry loop.
///
/// The production implementation performs the HTTP POST; tests substitute
/// one that fails or answers on script.
#[async_trait]
trait MessagesTransport: Send + Sync {
    /// Send one messages-API request and return the raw response body.
    async fn send(&self, payload: &Value) -> Result<String, RemoteReviewError>;
}

struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[async_trait]
impl MessagesTransport for HttpTransport {
    async fn send(&self, payload: &Value) -> Result<String, RemoteReviewError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RemoteReviewError::MissingApiKey);
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(payload)
            .send()
            .await
            .map_err(RemoteReviewError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(RemoteReviewError::Network)?;
        if !status.is_success() {
            return Err(RemoteReviewError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// One text block inside a messages-API response.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the remote review model.
pub struct RemoteReviewClient {
    transport: Arc<dyn MessagesTransport>,
    model: String,
    max_tokens: u32,
    temperature: f64,
    max_attempts: u32,
    retry_delay: std::time::Duration,
    max_code_chars: Option<usize>,
}

impl RemoteReviewClient {
    /// Build a client over a real HTTP transport.
    ///
    /// The per-attempt timeout from the configuration is applied to the
    /// underlying `reqwest` client.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteReviewError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RemoteReviewError::ClientBuild)?;

        let transport = HttpTransport {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
        };
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    fn with_transport(transport: Arc<dyn MessagesTransport>, config: &RemoteConfig) -> Self {
        Self {
            transport,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay,
            max_code_chars: config.max_code_chars,
        }
    }

    /// The model this client asks for.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Request a structured review payload from the model.
    ///
    /// Tries up to `max_attempts` times, sleeping `retry_delay` between
    /// attempts. A failed attempt is any transport, HTTP, or unwrapping
    /// error; the last one wins.
    pub async fn create_review(
        &self,
        request: &ReviewRequest,
        language: &str,
        style: ReviewStyle,
    ) -> Result<Value, RemoteReviewError> {
        let payload = self.build_payload(request, language, style);

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match self.attempt(&payload).await {
                Ok(review) => {
                    debug!(attempt, model = %self.model, "remote review succeeded");
                    return Ok(review);
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "remote review attempt failed"
                    );
                    last_error = Some(err);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(RemoteReviewError::Exhausted))
    }

    async fn attempt(&self, payload: &Value) -> Result<Value, RemoteReviewError> {
        let body = self.transport.send(payload).await?;
        extract_review_payload(&body)
    }

    fn build_payload(&self, request: &ReviewRequest, language: &str, style: ReviewStyle) -> Value {
        let code = prompts::clip_code(&request.code, self.max_code_chars);
        let user_prompt =
            prompts::build_user_prompt(code, request.language.as_deref(), language, style);

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": prompts::SYSTEM_PROMPT,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": user_prompt }
                    ],
                }
            ],
        })
    }
}

/// Unwrap a messages-API response body down to the review payload.
///
/// Steps: parse the envelope, join its text blocks, strip a surrounding
/// Markdown fence, parse the result as JSON, and unwrap a `data` wrapper
/// object if the model added one.
fn extract_review_payload(raw_body: &str) -> Result<Value, RemoteReviewError> {
    let envelope: Value =
        serde_json::from_str(raw_body).map_err(RemoteReviewError::EnvelopeSyntax)?;

    let content = envelope
        .get("content")
        .and_then(Value::as_array)
        .ok_or(RemoteReviewError::MissingContent)?;

    let combined: String = content
        .iter()
        .filter_map(|fragment| serde_json::from_value::<ContentBlock>(fragment.clone()).ok())
        .filter(|block| block.kind == "text")
        .map(|block| block.text.unwrap_or_default())
        .collect();
    let combined = combined.trim();
    if combined.is_empty() {
        return Err(RemoteReviewError::EmptyContent);
    }

    let cleaned = strip_code_fences(combined);
    let payload: Value =
        serde_json::from_str(&cleaned).map_err(RemoteReviewError::PayloadSyntax)?;

    if let Some(data) = payload.get("data").filter(|d| d.is_object()) {
        return Ok(data.clone());
    }
    if !payload.is_object() {
        return Err(RemoteReviewError::PayloadShape);
    }
    Ok(payload)
}

/// Drop a surrounding triple-backtick fence, tag line included.
fn strip_code_fences(text: &str) -> String {
    if !text.starts_with("```") {
        return text.to_string();
    }

    let mut lines: Vec<&str> = text.trim().lines().collect();
    if lines.first().is_some_and(|l| l.starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.starts_with("```")) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_config() -> RemoteConfig {
        RemoteConfig {
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            max_attempts: 3,
            retry_delay: Duration::ZERO,
            ..RemoteConfig::default()
        }
    }

    fn request() -> ReviewRequest {
        ReviewRequest {
            code: "const a = 1;".to_string(),
            language: Some("js".to_string()),
            style: None,
        }
    }

    /// Fails `failures` times, then answers with `body`.
    struct ScriptedTransport {
        calls: AtomicUsize,
        failures: usize,
        body: String,
    }

    impl ScriptedTransport {
        fn new(failures: usize, body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                body: body.to_string(),
            }
        }
    }

    #[async_trait]
    impl MessagesTransport for ScriptedTransport {
        async fn send(&self, _payload: &Value) -> Result<String, RemoteReviewError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(RemoteReviewError::Http {
                    status: 529,
                    body: "overloaded".to_string(),
                })
            } else {
                Ok(self.body.clone())
            }
        }
    }

    fn envelope_with_text(text: &str) -> String {
        serde_json::to_string(&json!({
            "content": [{ "type": "text", "text": text }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_review_retries_then_succeeds() {
        let body = envelope_with_text(r#"{"summary": "ok", "suggestions": []}"#);
        let transport = Arc::new(ScriptedTransport::new(2, &body));
        let client = RemoteReviewClient::with_transport(transport.clone(), &test_config());

        let payload = client
            .create_review(&request(), "javascript", ReviewStyle::Detail)
            .await
            .unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(payload["summary"], "ok");
    }

    #[tokio::test]
    async fn test_create_review_stops_after_max_attempts() {
        let transport = Arc::new(ScriptedTransport::new(usize::MAX, ""));
        let client = RemoteReviewClient::with_transport(transport.clone(), &test_config());

        let err = client
            .create_review(&request(), "javascript", ReviewStyle::Detail)
            .await
            .unwrap_err();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        match err {
            RemoteReviewError::Http { status, .. } => assert_eq!(status, 529),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_review_retries_on_unwrap_failures_too() {
        // Transport always "succeeds" but the body is not a messages envelope.
        let transport = Arc::new(ScriptedTransport::new(0, "not json"));
        let client = RemoteReviewClient::with_transport(transport.clone(), &test_config());

        let err = client
            .create_review(&request(), "javascript", ReviewStyle::Detail)
            .await
            .unwrap_err();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, RemoteReviewError::EnvelopeSyntax(_)));
    }

    #[test]
    fn test_build_payload_shape() {
        let transport = Arc::new(ScriptedTransport::new(0, ""));
        let client = RemoteReviewClient::with_transport(transport, &test_config());

        let payload =
            client.build_payload(&request(), "javascript", ReviewStyle::Bug);

        assert_eq!(payload["model"], "test-model");
        assert_eq!(payload["max_tokens"], 2048);
        assert_eq!(payload["temperature"], 0.0);
        assert_eq!(payload["system"], prompts::SYSTEM_PROMPT);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"][0]["type"], "text");

        let text = payload["messages"][0]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("\"style\": \"bug\""));
        assert!(text.contains("```javascript\nconst a = 1;\n```"));
    }

    #[test]
    fn test_build_payload_clips_oversized_code() {
        let config = RemoteConfig {
            max_code_chars: Some(7),
            ..test_config()
        };
        let transport = Arc::new(ScriptedTransport::new(0, ""));
        let client = RemoteReviewClient::with_transport(transport, &config);

        let payload = client.build_payload(&request(), "javascript", ReviewStyle::Bug);
        let text = payload["messages"][0]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("```javascript\nconst a\n```"));
    }

    #[test]
    fn test_extract_concatenates_text_fragments() {
        let body = serde_json::to_string(&json!({
            "content": [
                { "type": "text", "text": "{\"summary\"" },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": ": \"joined\"}" }
            ]
        }))
        .unwrap();

        let payload = extract_review_payload(&body).unwrap();
        assert_eq!(payload["summary"], "joined");
    }

    #[test]
    fn test_extract_strips_markdown_fences() {
        let body = envelope_with_text("```json\n{\"summary\": \"fenced\"}\n```");
        let payload = extract_review_payload(&body).unwrap();
        assert_eq!(payload["summary"], "fenced");
    }

    #[test]
    fn test_extract_unwraps_data_wrapper() {
        let body = envelope_with_text(r#"{"data": {"summary": "wrapped"}}"#);
        let payload = extract_review_payload(&body).unwrap();
        assert_eq!(payload["summary"], "wrapped");
    }

    #[test]
    fn test_extract_keeps_non_object_data_field() {
        // A scalar `data` field is not a wrapper; the payload stands as-is.
        let body = envelope_with_text(r#"{"data": 7, "summary": "s"}"#);
        let payload = extract_review_payload(&body).unwrap();
        assert_eq!(payload["data"], 7);
        assert_eq!(payload["summary"], "s");
    }

    #[test]
    fn test_extract_rejects_missing_content() {
        let err = extract_review_payload(r#"{"id": "msg_1"}"#).unwrap_err();
        assert!(matches!(err, RemoteReviewError::MissingContent));
    }

    #[test]
    fn test_extract_rejects_empty_text() {
        let body = envelope_with_text("   ");
        let err = extract_review_payload(&body).unwrap_err();
        assert!(matches!(err, RemoteReviewError::EmptyContent));
    }

    #[test]
    fn test_extract_rejects_non_object_payload() {
        let body = envelope_with_text("[1, 2, 3]");
        let err = extract_review_payload(&body).unwrap_err();
        assert!(matches!(err, RemoteReviewError::PayloadShape));
    }

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        // Unterminated fence still drops the opening line.
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_http_error_message_includes_body_when_present() {
        let with_body = RemoteReviewError::Http {
            status: 429,
            body: "slow down".to_string(),
        };
        assert_eq!(
            with_body.to_string(),
            "remote review call failed with HTTP 429: slow down"
        );

        let bare = RemoteReviewError::Http {
            status: 500,
            body: String::new(),
        };
        assert_eq!(bare.to_string(), "remote review call failed with HTTP 500");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_every_attempt() {
        let config = RemoteConfig {
            api_key: None,
            max_attempts: 2,
            retry_delay: Duration::ZERO,
            ..RemoteConfig::default()
        };
        let client = RemoteReviewClient::new(&config).unwrap();

        let err = client
            .create_review(&request(), "javascript", ReviewStyle::Detail)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteReviewError::MissingApiKey));
    }
}
