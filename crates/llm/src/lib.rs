pub mod client;
pub mod error;
pub mod prompt;
pub mod sse;

pub use client::OpenAiChatClient;
pub use error::{LlmError, Result};
pub use prompt::{SectionContext, TranscriptMessage, build_tutor_prompt};
pub use sse::{SseFrame, SseLineBuffer};
