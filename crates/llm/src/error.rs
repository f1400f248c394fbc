use thiserror::Error;
use tutorium_core::domain::LlmProviderError;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model returned an empty completion")]
    EmptyCompletion,
}

impl From<LlmError> for LlmProviderError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(inner) if inner.is_timeout() => LlmProviderError::Timeout,
            LlmError::Http(inner) if inner.is_connect() => {
                LlmProviderError::Unavailable(inner.to_string())
            }
            other => LlmProviderError::Failed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
