//! OpenRouter API provider
//!
//! Talks to the OpenAI-compatible chat completions endpoint at openrouter.ai

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::llm_engine::provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, FragmentStream, LlmError,
    Message, MessageRole,
};
use crate::llm_engine::stream::{embedded_error, extract_completion, ingest_stream};

/// One text part of a message body
#[derive(Debug, Serialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

/// OpenRouter message format: content is always an array of parts
#[derive(Debug, Serialize)]
struct OpenRouterMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

impl From<&Message> for OpenRouterMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: vec![ContentPart {
                kind: "text",
                text: msg.content.clone(),
            }],
        }
    }
}

/// OpenRouter chat request
#[derive(Debug, Serialize)]
struct OpenRouterChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenRouterMessage>,
    stream: bool,
}

/// OpenRouter provider configuration
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub base_url: String,
    /// Deadline for a whole non-streamed answer, and for the response headers of a streamed one
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Longest silence tolerated between two chunks of a streamed body
    pub idle_timeout_secs: u64,
    /// Sent as `HTTP-Referer`; OpenRouter uses it to attribute traffic
    pub referer: String,
    /// Sent as `X-Title`
    pub title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            timeout_secs: 120,
            connect_timeout_secs: 15,
            idle_timeout_secs: 90,
            referer: "http://localhost".to_string(),
            title: "Tai Chat".to_string(),
        }
    }
}

/// OpenRouter completion provider
pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| LlmError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn with_default_config() -> Result<Self, LlmError> {
        Self::new(OpenRouterConfig::default())
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// POST the request; any non-2xx answer becomes `LlmError::Http`.
    ///
    /// A non-streamed request is bounded as a whole. A streamed one only waits
    /// `timeout_secs` for the headers; its body is bounded per chunk instead.
    async fn send(
        &self,
        api_key: &str,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<Response, LlmError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::NotConfigured);
        }

        let body = OpenRouterChatRequest {
            model: &request.model,
            messages: request.messages.iter().map(OpenRouterMessage::from).collect(),
            stream,
        };

        log::info!(
            "Sending {} message(s) to {} (model: {}, stream: {})",
            body.messages.len(),
            self.provider_name(),
            request.model,
            stream
        );

        let deadline = Duration::from_secs(self.config.timeout_secs);
        let mut builder = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&body);
        if !stream {
            builder = builder.timeout(deadline);
        }

        let response = tokio::time::timeout(deadline, builder.send())
            .await
            .map_err(|_| {
                LlmError::RequestFailed(format!(
                    "No response from {} within {}s",
                    self.provider_name(),
                    deadline.as_secs()
                ))
            })?
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let err = http_error(status, &body);
            log::warn!("OpenRouter returned {}: {}", status, err);
            return Err(err);
        }

        Ok(response)
    }
}

/// Fail the body once no chunk arrives for `idle`
fn with_idle_timeout<S, B, E>(body: S, idle: Duration) -> impl Stream<Item = Result<B, String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    stream::unfold(Some(Box::pin(body)), move |body| async move {
        let mut body = body?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
            Ok(Some(Err(e))) => Some((Err(e.to_string()), Some(body))),
            Ok(None) => None,
            Err(_) => {
                log::warn!("Stream stalled for {}s, giving up", idle.as_secs());
                Some((Err(format!("no data received for {}s", idle.as_secs())), None))
            }
        }
    })
}

/// Error for a non-2xx answer: `error.message` from the body when present
fn http_error(status: StatusCode, body: &[u8]) -> LlmError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| embedded_error(&value))
        .unwrap_or_else(|| format!("API request failed: {}", status.as_u16()));

    LlmError::Http {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn provider_name(&self) -> &'static str {
        "openrouter"
    }

    async fn complete(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let response = self.send(api_key, &request, false).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| LlmError::RequestFailed(format!("Failed to read response: {}", e)))?;

        let content = extract_completion(&body)?;

        Ok(CompletionResponse {
            content,
            model: request.model,
        })
    }

    async fn complete_streaming(
        &self,
        api_key: &str,
        request: CompletionRequest,
    ) -> Result<FragmentStream, LlmError> {
        let response = self.send(api_key, &request, true).await?;
        let idle = Duration::from_secs(self.config.idle_timeout_secs);
        Ok(ingest_stream(with_idle_timeout(response.bytes_stream(), idle)))
    }
}
