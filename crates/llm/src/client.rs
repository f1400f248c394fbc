//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tutorium_core::domain::{LlmProvider, LlmProviderError, LlmRequest};

use crate::error::{LlmError, Result};
use crate::sse::SseLineBuffer;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for any chat-completions endpoint speaking the OpenAI wire
/// format. The API key travels with each request because every
/// configuration row carries its own.
pub struct OpenAiChatClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn openai() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }

    fn build_body<'a>(request: &'a LlmRequest, stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.base_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature.value(),
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&request.api_key)
            .json(&Self::build_body(request, stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn request_completion(&self, request: &LlmRequest) -> Result<String> {
        let response = self.send(request, false).await?;
        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }

    async fn request_stream(
        &self,
        request: &LlmRequest,
        tokens: &mpsc::Sender<String>,
    ) -> Result<String> {
        let response = self.send(request, true).await?;

        let mut stream = response.bytes_stream();
        let mut parser = SseLineBuffer::new();
        let mut accumulated = String::new();

        'outer: while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;

            let text = match String::from_utf8(chunk.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    warn!("skipping non-utf8 chunk in completion stream");
                    continue;
                }
            };

            for frame in parser.push_chunk(&text) {
                if frame.data == "[DONE]" {
                    break 'outer;
                }

                let payload: Value = match serde_json::from_str(&frame.data) {
                    Ok(value) => value,
                    Err(_) => {
                        warn!(data = %frame.data, "received non-JSON stream frame");
                        continue;
                    }
                };

                let Some(delta) = payload
                    .get("choices")
                    .and_then(Value::as_array)
                    .and_then(|choices| choices.first())
                    .and_then(|choice| choice.get("delta"))
                    .and_then(|delta| delta.get("content"))
                    .and_then(Value::as_str)
                else {
                    continue;
                };

                if delta.is_empty() {
                    continue;
                }

                accumulated.push_str(delta);
                // A gone receiver only means nobody is watching; keep
                // generating so the full reply can still be persisted.
                if tokens.send(delta.to_string()).await.is_err() {
                    debug!("token receiver dropped, continuing to accumulate");
                }
            }
        }

        if accumulated.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }

        Ok(accumulated)
    }
}

#[async_trait]
impl LlmProvider for OpenAiChatClient {
    async fn complete(&self, request: LlmRequest) -> std::result::Result<String, LlmProviderError> {
        self.request_completion(&request).await.map_err(Into::into)
    }

    async fn complete_stream(
        &self,
        request: LlmRequest,
        tokens: mpsc::Sender<String>,
    ) -> std::result::Result<String, LlmProviderError> {
        self.request_stream(&request, &tokens)
            .await
            .map_err(Into::into)
    }
}
