use thiserror::Error;
use tutorium_core::domain::{
    ConversationId, DomainError, HomeworkId, LlmConfigId, LlmProviderError, SectionId,
    SubmissionId, UserId,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("teacher not found for user: {0}")]
    TeacherNotFound(UserId),

    #[error("homework not found: {0}")]
    HomeworkNotFound(HomeworkId),

    #[error("section not found: {0}")]
    SectionNotFound(SectionId),

    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    #[error("submission not found: {0}")]
    SubmissionNotFound(SubmissionId),

    #[error("llm config not found: {0}")]
    LlmConfigNotFound(LlmConfigId),

    #[error("no active llm configuration is available")]
    NoLlmConfig,

    #[error("homework title must not be empty")]
    EmptyTitle,

    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("duplicate section order: {0}")]
    DuplicateSectionOrder(u8),

    #[error("conversation {0} is not a teacher test conversation")]
    NotATeacherTestConversation(ConversationId),

    #[error("conversation {0} has been deleted")]
    ConversationDeleted(ConversationId),

    #[error("conversation {conversation} does not belong to user {user}")]
    ConversationOwnership {
        conversation: ConversationId,
        user: UserId,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("llm generation failed: {0}")]
    Llm(#[from] LlmProviderError),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),

    /// A stored row no longer parses into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
