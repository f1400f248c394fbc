use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::Temperature;

/// One fully-resolved generation request: the assembled tutoring prompt
/// plus the settings of whichever config the conversation resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub api_key: String,
    pub base_prompt: String,
    pub prompt: String,
    pub temperature: Temperature,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmProviderError {
    #[error("llm provider unavailable: {0}")]
    Unavailable(String),
    #[error("llm provider timeout")]
    Timeout,
    #[error("llm provider failed: {0}")]
    Failed(String),
}

/// Boundary to the language-model backend. Implementations must not
/// panic; failures surface as [`LlmProviderError`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run the request to completion and return the full reply text.
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmProviderError>;

    /// Run the request, pushing incremental tokens through `tokens` as
    /// they arrive, and return the full accumulated reply. A dropped
    /// receiver must not abort generation.
    async fn complete_stream(
        &self,
        request: LlmRequest,
        tokens: mpsc::Sender<String>,
    ) -> Result<String, LlmProviderError>;
}
