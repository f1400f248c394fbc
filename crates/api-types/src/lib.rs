//! Shared request/response types used by API-facing crates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

impl HealthCheckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// One event on the chat stream. Exactly one `AiMessageStart` ..
/// `AiMessageComplete` pair is emitted per assistant turn, with zero or
/// more `AiToken` events in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// Echo of the caller's persisted message.
    UserMessage {
        id: String,
        content: String,
        kind: String,
    },
    /// The assistant turn began; `id` is the message id the tokens
    /// accumulate into.
    AiMessageStart { id: String },
    /// Incremental assistant output.
    AiToken { id: String, token: String },
    /// The assistant turn finished and was persisted.
    AiMessageComplete { id: String, final_content: String },
    /// Generation failed. The caller's message remains persisted.
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExecutionRequest {
    pub code: String,
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}
