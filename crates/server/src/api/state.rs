//! Shared application state handed to every router.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tutorium_core::domain::LlmProvider;

use crate::service::{
    AccountService, ConversationService, HomeworkService, LlmConfigService, SubmissionService,
};

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub homeworks: HomeworkService,
    pub conversations: ConversationService,
    pub submissions: SubmissionService,
    pub llm_configs: LlmConfigService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            accounts: AccountService::new(db.clone()),
            homeworks: HomeworkService::new(db.clone()),
            conversations: ConversationService::new(db.clone(), provider),
            submissions: SubmissionService::new(db.clone()),
            llm_configs: LlmConfigService::new(db),
        }
    }
}
