//! HTTP adapter for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Both DeepSeek and xAI Grok speak this dialect, so one adapter serves every
//! `ProviderKind`; only the base URL, model and key differ.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChatProvider, Completion, CompletionRequest, FinishReason, LlmError, ProviderKind};

const MAX_RETRIES: u32 = 3;
/// First backoff delay; doubles on each further retry.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, PartialEq)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// A configured chat-completion backend.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    client: Client,
    kind: ProviderKind,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    retry_base_delay: Duration,
}

impl OpenAiCompatProvider {
    pub fn new(
        kind: ProviderKind,
        base_url: &str,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            kind,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            timeout_secs,
            retry_base_delay: RETRY_BASE_DELAY,
        })
    }

    #[cfg(test)]
    fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    /// Retries on 429 and 5xx with exponential backoff. Transport failures, timeouts
    /// included, and other 4xx responses fail the call immediately. Exhausted 429
    /// retries surface as `RateLimited`.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut last_error = LlmError::RateLimited {
            retries: MAX_RETRIES,
        };

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    provider = %self.kind,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Chat completion failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!(provider = %self.kind, %status, "Provider returned retryable status: {text}");
                last_error = if status.as_u16() == 429 {
                    LlmError::RateLimited {
                        retries: MAX_RETRIES,
                    }
                } else {
                    LlmError::Api {
                        status: status.as_u16(),
                        message: text,
                    }
                };
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let raw = response.text().await.map_err(|e| self.transport_error(e))?;
            let completion = parse_completion(&raw)?;

            debug!(
                provider = %self.kind,
                model = %self.model,
                max_tokens = request.max_tokens,
                finish = ?completion.finish_reason,
                output_tokens = ?completion.output_tokens,
                "Chat completion succeeded"
            );

            return Ok(completion);
        }

        Err(last_error)
    }
}

impl OpenAiCompatProvider {
    fn transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            LlmError::Http(err)
        }
    }
}

/// System message, user message, then any prior turns in order.
fn build_messages<'a>(request: &'a CompletionRequest<'a>) -> Vec<WireMessage<'a>> {
    let mut messages = Vec::with_capacity(2 + request.prior_turns.len());
    messages.push(WireMessage {
        role: "system",
        content: request.system,
    });
    messages.push(WireMessage {
        role: "user",
        content: request.user,
    });
    for turn in request.prior_turns {
        messages.push(WireMessage {
            role: match turn.role {
                super::Role::User => "user",
                super::Role::Assistant => "assistant",
            },
            content: &turn.content,
        });
    }
    messages
}

fn parse_completion(raw: &str) -> Result<Completion, LlmError> {
    let response: ChatResponse = serde_json::from_str(raw)?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyContent)?;

    Ok(Completion {
        text: choice.message.content.unwrap_or_default(),
        finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
        output_tokens: response.usage.map(|u| u.completion_tokens),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ChatTurn;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stub_provider(server: &MockServer, timeout_secs: u64) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            ProviderKind::Standard,
            &server.uri(),
            "sk-test".to_string(),
            "deepseek-chat".to_string(),
            timeout_secs,
        )
        .unwrap()
        .with_retry_base_delay(Duration::from_millis(10))
    }

    fn ok_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"completion_tokens": 2}
        })
    }

    async fn ask(provider: &OpenAiCompatProvider) -> Result<Completion, LlmError> {
        let request = CompletionRequest {
            system: "sys",
            user: "Say ok.",
            prior_turns: &[],
            temperature: 0.7,
            max_tokens: 10,
        };
        provider.complete(&request).await
    }

    async fn hits(server: &MockServer) -> usize {
        server.received_requests().await.unwrap_or_default().len()
    }

    #[tokio::test]
    async fn test_rate_limit_then_success_retries_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("ok.")))
            .mount(&server)
            .await;

        let completion = ask(&stub_provider(&server, 5)).await.unwrap();
        assert_eq!(completion.text, "ok.");
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(hits(&server).await, 2);
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = ask(&stub_provider(&server, 5)).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { retries: 3 }));
        assert_eq!(hits(&server).await, 3);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = ask(&stub_provider(&server, 5)).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, ref message } if message == "overloaded"));
        assert_eq!(hits(&server).await, 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "max_tokens is too large", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = ask(&stub_provider(&server, 5)).await.unwrap_err();
        assert!(
            matches!(err, LlmError::Api { status: 400, ref message } if message == "max_tokens is too large")
        );
        assert_eq!(hits(&server).await, 1);
    }

    #[tokio::test]
    async fn test_timeout_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("late."))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = ask(&stub_provider(&server, 1)).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { secs: 1 }));
        assert_eq!(hits(&server).await, 1);
    }

    #[test]
    fn test_parse_completion_stop() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Done."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let completion = parse_completion(raw).unwrap();
        assert_eq!(completion.text, "Done.");
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.output_tokens, Some(3));
    }

    #[test]
    fn test_parse_completion_length_without_usage() {
        let raw = r#"{"choices": [{"message": {"content": "The lecture cov"}, "finish_reason": "length"}]}"#;
        let completion = parse_completion(raw).unwrap();
        assert_eq!(completion.finish_reason, FinishReason::Length);
        assert_eq!(completion.output_tokens, None);
    }

    #[test]
    fn test_parse_completion_null_content_is_empty_text() {
        let raw = r#"{"choices": [{"message": {"content": null}, "finish_reason": "stop"}]}"#;
        let completion = parse_completion(raw).unwrap();
        assert!(completion.text.is_empty());
    }

    #[test]
    fn test_parse_completion_without_choices_fails() {
        let raw = r#"{"choices": []}"#;
        assert!(matches!(parse_completion(raw), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_parse_completion_rejects_garbage() {
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn test_build_messages_orders_prior_turns_after_user() {
        let turns = vec![
            ChatTurn::assistant("partial text"),
            ChatTurn::user("continue"),
        ];
        let request = CompletionRequest {
            system: "sys",
            user: "write",
            prior_turns: &turns,
            temperature: 0.7,
            max_tokens: 100,
        };
        let messages = build_messages(&request);
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[2].content, "partial text");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let provider = OpenAiCompatProvider::new(
            ProviderKind::Standard,
            "https://api.deepseek.com/",
            "key".to_string(),
            "deepseek-chat".to_string(),
            300,
        )
        .unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(provider.model(), "deepseek-chat");
    }
}
