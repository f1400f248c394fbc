pub mod account;
pub mod conversation;
pub mod error;
pub mod homework;
pub mod llm_config;
pub mod submission;

pub use account::{AccountRole, AccountService, NewUser, RegisteredUser};
pub use conversation::{
    ConversationData, ConversationService, ConversationStarted, ConversationSummary,
    CodeExecutionRecorded, MessageData, MessageSent, StreamUpdate,
};
pub use error::{Result, ServiceError};
pub use homework::{
    HomeworkCreated, HomeworkDetail, HomeworkProgress, HomeworkService, HomeworkUpdate,
    HomeworkUpdated, NewHomework, NewSection, SectionDetail, SectionProgress, SectionUpdate,
};
pub use llm_config::{LlmConfigData, LlmConfigService, LlmConfigUpdate, NewLlmConfig};
pub use submission::{
    AutoSubmitReport, SectionSweepDetail, SubmissionData, SubmissionOutcome, SubmissionService,
};
