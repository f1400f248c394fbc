use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::{Mutex, mpsc};
use tutorium_core::domain::{
    LlmProvider, LlmProviderError, LlmRequest, TeacherId, UserId,
};
use tutorium_migration::{Migrator, MigratorTrait};
use tutorium_server::service::{
    AccountRole, AccountService, ConversationService, HomeworkCreated, HomeworkService,
    LlmConfigService, NewHomework, NewLlmConfig, NewSection, NewUser, SubmissionService,
};

/// Scriptable stand-in for the model backend: canned replies, an
/// on-demand failure switch, and a record of every request received.
pub struct MockProvider {
    replies: Mutex<VecDeque<String>>,
    fail: AtomicBool,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Self::with_replies(&["Mock tutor reply."])
    }

    pub fn with_replies(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
            fail: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().await.last().cloned()
    }

    async fn next_reply(&self, request: LlmRequest) -> Result<String, LlmProviderError> {
        self.requests.lock().await.push(request);

        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmProviderError::Failed(
                "mock generation failure".to_string(),
            ));
        }

        let mut replies = self.replies.lock().await;
        Ok(replies
            .pop_front()
            .unwrap_or_else(|| "Mock tutor reply.".to_string()))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmProviderError> {
        self.next_reply(request).await
    }

    async fn complete_stream(
        &self,
        request: LlmRequest,
        tokens: mpsc::Sender<String>,
    ) -> Result<String, LlmProviderError> {
        let reply = self.next_reply(request).await?;

        for token in reply.split_inclusive(' ') {
            let _ = tokens.send(token.to_string()).await;
        }

        Ok(reply)
    }
}

pub struct Fixture {
    pub db: DatabaseConnection,
    pub provider: Arc<MockProvider>,
    pub accounts: AccountService,
    pub homeworks: HomeworkService,
    pub conversations: ConversationService,
    pub submissions: SubmissionService,
    pub llm_configs: LlmConfigService,
}

/// Fresh in-memory database plus a full service set wired to a mock
/// provider. One pooled connection keeps every query on the same
/// in-memory sqlite instance.
pub async fn fixture() -> Fixture {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);

    let db = Database::connect(options)
        .await
        .expect("in-memory database should connect");
    Migrator::up(&db, None)
        .await
        .expect("migrations should apply");

    let provider = MockProvider::new();

    Fixture {
        accounts: AccountService::new(db.clone()),
        homeworks: HomeworkService::new(db.clone()),
        conversations: ConversationService::new(db.clone(), provider.clone()),
        submissions: SubmissionService::new(db.clone()),
        llm_configs: LlmConfigService::new(db.clone()),
        db,
        provider,
    }
}

pub async fn register_teacher(fixture: &Fixture, username: &str) -> (UserId, TeacherId) {
    let registered = fixture
        .accounts
        .register_user(
            NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: None,
                last_name: None,
            },
            AccountRole::Teacher,
        )
        .await
        .expect("teacher registration should succeed");

    (
        registered.user_id,
        registered.teacher_id.expect("teacher profile should exist"),
    )
}

pub async fn register_student(fixture: &Fixture, username: &str) -> UserId {
    let registered = fixture
        .accounts
        .register_user(
            NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: None,
                last_name: None,
            },
            AccountRole::Student,
        )
        .await
        .expect("student registration should succeed");

    registered.user_id
}

pub fn due_in_days(days: i64) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::days(days)
}

/// (title, order, solution) triples become sections.
pub async fn create_homework(
    fixture: &Fixture,
    teacher_id: TeacherId,
    due_date: NaiveDateTime,
    sections: &[(&str, u8, Option<&str>)],
) -> HomeworkCreated {
    fixture
        .homeworks
        .create_homework_with_sections(
            NewHomework {
                title: "Intro".to_string(),
                description: "Introductory homework".to_string(),
                due_date,
                llm_config_id: None,
                sections: sections
                    .iter()
                    .map(|(title, order, solution)| NewSection {
                        title: (*title).to_string(),
                        content: format!("Work through {title}."),
                        order: *order,
                        solution: solution.map(str::to_string),
                    })
                    .collect(),
            },
            teacher_id,
        )
        .await
        .expect("homework creation should succeed")
}

pub async fn seed_default_config(fixture: &Fixture) {
    fixture
        .llm_configs
        .create_config(NewLlmConfig {
            name: "default".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            api_key: "sk-test".to_string(),
            base_prompt: "You are a patient AI tutor.".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            is_default: true,
            is_active: true,
        })
        .await
        .expect("default config should be created");
}
