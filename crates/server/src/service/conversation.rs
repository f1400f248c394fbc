use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tutor_llm::{SectionContext, TranscriptMessage, build_tutor_prompt};
use tutorium_core::domain::{
    ConversationId, ConversationRole, HomeworkId, LlmProvider, LlmRequest, MessageBody, MessageId,
    MessageKind, SectionId, Temperature, UserId,
};

use crate::entity::{conversation, homework, llm_config, message, section, section_solution};
use crate::service::account::profiles_for;
use crate::service::error::{Result, ServiceError};
use crate::service::homework::parse_id;
use crate::service::llm_config::find_default_config;

#[derive(Debug, Clone)]
pub struct ConversationStarted {
    pub conversation_id: ConversationId,
    pub initial_message_id: MessageId,
}

#[derive(Debug, Clone)]
pub struct MessageSent {
    pub user_message_id: MessageId,
    pub ai_message_id: MessageId,
    pub ai_response: String,
}

#[derive(Debug, Clone)]
pub struct MessageData {
    pub id: MessageId,
    pub content: String,
    pub kind: MessageKind,
    pub timestamp: NaiveDateTime,
    pub is_from_student: bool,
    pub is_from_ai: bool,
    pub is_system: bool,
}

#[derive(Debug, Clone)]
pub struct ConversationData {
    pub id: ConversationId,
    pub user_id: UserId,
    pub section_id: SectionId,
    pub section_title: String,
    pub homework_id: HomeworkId,
    pub homework_title: String,
    pub role: ConversationRole,
    pub can_submit: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub messages: Vec<MessageData>,
}

#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub user_id: UserId,
    pub section_id: SectionId,
    pub section_title: String,
    pub role: ConversationRole,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct CodeExecutionRecorded {
    pub code_message_id: MessageId,
    pub result_message_id: MessageId,
    pub has_error: bool,
}

/// Progress of one streamed assistant turn, in emission order. The API
/// layer translates these into wire events.
#[derive(Debug, Clone)]
pub enum StreamUpdate {
    UserMessage {
        id: MessageId,
        content: String,
        kind: MessageKind,
    },
    AiMessageStart {
        id: MessageId,
    },
    AiToken {
        id: MessageId,
        token: String,
    },
    AiMessageComplete {
        id: MessageId,
        final_content: String,
    },
}

#[derive(Clone)]
pub struct ConversationService {
    db: DatabaseConnection,
    provider: Arc<dyn LlmProvider>,
}

impl ConversationService {
    pub fn new(db: DatabaseConnection, provider: Arc<dyn LlmProvider>) -> Self {
        Self { db, provider }
    }

    /// Open a conversation on a section. The role is derived from the
    /// owner's profiles once, here, and stored; a user carrying both
    /// profiles is rejected. The conversation starts with a single AI
    /// greeting referencing the section.
    #[tracing::instrument(skip(self))]
    pub async fn start_conversation(
        &self,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<ConversationStarted> {
        let section_model = section::Entity::find_by_id(section_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(ServiceError::SectionNotFound(section_id))?;

        let (has_teacher, has_student) = profiles_for(&self.db, user_id).await?;
        if !has_teacher && !has_student {
            return Err(ServiceError::UserNotFound(user_id));
        }
        let role = ConversationRole::derive(has_teacher, has_student)?;

        let conversation_id = ConversationId::new();
        let initial_message_id = MessageId::new();
        let now = Utc::now().naive_utc();

        let greeting = format!(
            "Hello! I'm here to help you with Section {}: {}. What would you like to work on?",
            section_model.order, section_model.title
        );

        let txn = self.db.begin().await?;

        conversation::ActiveModel {
            id: Set(conversation_id.to_string()),
            user_id: Set(user_id.to_string()),
            section_id: Set(section_id.to_string()),
            role: Set(map_role_code(role)),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_message(
            &txn,
            conversation_id,
            initial_message_id,
            greeting,
            &MessageKind::Ai,
            now,
        )
        .await?;

        txn.commit().await?;

        info!(
            conversation_id = %conversation_id,
            section_id = %section_id,
            role = ?role,
            "started conversation"
        );

        Ok(ConversationStarted {
            conversation_id,
            initial_message_id,
        })
    }

    /// Persist the caller's message, round-trip to the model, persist the
    /// reply. When generation fails the caller's message stays stored and
    /// the error is returned for the caller to retry.
    #[tracing::instrument(skip(self, content))]
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        content: String,
        kind: MessageKind,
    ) -> Result<MessageSent> {
        let conversation_model = self.load_open_conversation(conversation_id).await?;
        let body = MessageBody::new(content)?;

        let user_message_id = MessageId::new();
        let user_timestamp = Utc::now().naive_utc();
        insert_message(
            &self.db,
            conversation_id,
            user_message_id,
            body.as_str().to_string(),
            &kind,
            user_timestamp,
        )
        .await?;
        self.touch_conversation(&conversation_model).await?;

        let request = self
            .resolve_request(&conversation_model, body.as_str(), &kind, user_message_id)
            .await?;

        let ai_response = self.provider.complete(request).await?;

        let ai_message_id = MessageId::new();
        insert_message(
            &self.db,
            conversation_id,
            ai_message_id,
            ai_response.clone(),
            &MessageKind::Ai,
            after(user_timestamp),
        )
        .await?;

        Ok(MessageSent {
            user_message_id,
            ai_message_id,
            ai_response,
        })
    }

    /// Streaming variant of [`send_message`](Self::send_message).
    ///
    /// Emits `UserMessage` → `AiMessageStart` → `AiToken`* →
    /// `AiMessageComplete` through `updates`. The sender going away only
    /// silences delivery: generation continues and the finished assistant
    /// message is persisted regardless, so a disconnected client never
    /// loses the turn.
    #[tracing::instrument(skip(self, content, updates))]
    pub async fn send_message_streaming(
        &self,
        conversation_id: ConversationId,
        content: String,
        kind: MessageKind,
        updates: mpsc::Sender<StreamUpdate>,
    ) -> Result<MessageSent> {
        let conversation_model = self.load_open_conversation(conversation_id).await?;
        let body = MessageBody::new(content)?;

        let user_message_id = MessageId::new();
        let user_timestamp = Utc::now().naive_utc();
        insert_message(
            &self.db,
            conversation_id,
            user_message_id,
            body.as_str().to_string(),
            &kind,
            user_timestamp,
        )
        .await?;
        self.touch_conversation(&conversation_model).await?;

        let _ = updates
            .send(StreamUpdate::UserMessage {
                id: user_message_id,
                content: body.as_str().to_string(),
                kind: kind.clone(),
            })
            .await;

        let request = self
            .resolve_request(&conversation_model, body.as_str(), &kind, user_message_id)
            .await?;

        let ai_message_id = MessageId::new();
        let _ = updates
            .send(StreamUpdate::AiMessageStart { id: ai_message_id })
            .await;

        let (token_tx, mut token_rx) = mpsc::channel::<String>(64);
        let token_updates = updates.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(token) = token_rx.recv().await {
                let _ = token_updates
                    .send(StreamUpdate::AiToken {
                        id: ai_message_id,
                        token,
                    })
                    .await;
            }
        });

        let result = self.provider.complete_stream(request, token_tx).await;
        if let Err(join_error) = forwarder.await {
            warn!(error = %join_error, "token forwarder exited abnormally");
        }

        let ai_response = result?;

        insert_message(
            &self.db,
            conversation_id,
            ai_message_id,
            ai_response.clone(),
            &MessageKind::Ai,
            after(user_timestamp),
        )
        .await?;

        let _ = updates
            .send(StreamUpdate::AiMessageComplete {
                id: ai_message_id,
                final_content: ai_response.clone(),
            })
            .await;

        Ok(MessageSent {
            user_message_id,
            ai_message_id,
            ai_response,
        })
    }

    pub async fn get_conversation_data(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationData>> {
        let Some(conversation_model) = conversation::Entity::find_by_id(conversation_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let section_model = section::Entity::find_by_id(conversation_model.section_id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::Corrupt(format!(
                    "conversation {conversation_id} references a missing section"
                ))
            })?;
        let homework_model = homework::Entity::find_by_id(section_model.homework_id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::Corrupt(format!(
                    "section {} references a missing homework",
                    section_model.id
                ))
            })?;

        let messages = message::Entity::find()
            .filter(message::Column::ConversationId.eq(conversation_model.id.clone()))
            .order_by_asc(message::Column::Timestamp)
            .all(&self.db)
            .await?;

        let user_id = parse_id::<UserId>(&conversation_model.user_id, "conversation.user_id")?;
        let role = map_role(conversation_model.role)?;
        let (_, has_student) = profiles_for(&self.db, user_id).await?;
        let can_submit =
            has_student && !conversation_model.is_deleted && !role.is_teacher_test();

        Ok(Some(ConversationData {
            id: conversation_id,
            user_id,
            section_id: parse_id::<SectionId>(&section_model.id, "section.id")?,
            section_title: section_model.title,
            homework_id: parse_id::<HomeworkId>(&homework_model.id, "homework.id")?,
            homework_title: homework_model.title,
            role,
            can_submit,
            created_at: conversation_model.created_at,
            updated_at: conversation_model.updated_at,
            messages: messages
                .into_iter()
                .map(map_message)
                .collect::<Result<Vec<_>>>()?,
        }))
    }

    pub async fn add_system_message(
        &self,
        conversation_id: ConversationId,
        content: String,
    ) -> Result<MessageId> {
        self.load_open_conversation(conversation_id).await?;
        let body = MessageBody::new(content)?;

        let message_id = MessageId::new();
        insert_message(
            &self.db,
            conversation_id,
            message_id,
            body.into_string(),
            &MessageKind::System,
            Utc::now().naive_utc(),
        )
        .await?;

        Ok(message_id)
    }

    /// Record one sandbox run as an atomic pair of messages: the code and
    /// its outcome. The sandbox itself lives in the browser; only its
    /// outputs arrive here.
    #[tracing::instrument(skip(self, code, output, error))]
    pub async fn handle_code_execution(
        &self,
        conversation_id: ConversationId,
        code: String,
        output: String,
        error: Option<String>,
    ) -> Result<CodeExecutionRecorded> {
        self.load_open_conversation(conversation_id).await?;
        let code_body = MessageBody::new(code)?;

        let (result_content, result_kind, has_error) = match error {
            Some(error) => (format!("Error: {error}"), MessageKind::System, true),
            None => (format!("Output:\n{output}"), MessageKind::CodeResult, false),
        };

        let code_message_id = MessageId::new();
        let result_message_id = MessageId::new();
        let code_timestamp = Utc::now().naive_utc();

        let txn = self.db.begin().await?;

        insert_message(
            &txn,
            conversation_id,
            code_message_id,
            code_body.into_string(),
            &MessageKind::Code,
            code_timestamp,
        )
        .await?;

        insert_message(
            &txn,
            conversation_id,
            result_message_id,
            result_content,
            &result_kind,
            after(code_timestamp),
        )
        .await?;

        txn.commit().await?;

        Ok(CodeExecutionRecorded {
            code_message_id,
            result_message_id,
            has_error,
        })
    }

    /// Soft-delete a teacher's dry-run conversation. Student
    /// conversations are never deletable; the row stays for audit either
    /// way.
    #[tracing::instrument(skip(self))]
    pub async fn delete_teacher_test_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<()> {
        let conversation_model = conversation::Entity::find_by_id(conversation_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(ServiceError::ConversationNotFound(conversation_id))?;

        if !map_role(conversation_model.role)?.is_teacher_test() {
            return Err(ServiceError::NotATeacherTestConversation(conversation_id));
        }

        let now = Utc::now().naive_utc();
        let mut active: conversation::ActiveModel = conversation_model.into();
        active.is_deleted = Set(true);
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;

        info!(conversation_id = %conversation_id, "soft-deleted teacher test conversation");
        Ok(())
    }

    pub async fn get_teacher_test_conversations(
        &self,
        teacher_user_id: UserId,
        section_id: Option<SectionId>,
    ) -> Result<Vec<ConversationSummary>> {
        let mut query = conversation::Entity::find()
            .filter(conversation::Column::UserId.eq(teacher_user_id.to_string()))
            .filter(conversation::Column::IsDeleted.eq(false))
            .filter(conversation::Column::Role.eq(map_role_code(ConversationRole::TeacherTest)));

        if let Some(section_id) = section_id {
            query = query.filter(conversation::Column::SectionId.eq(section_id.to_string()));
        }

        let conversations = query
            .order_by_desc(conversation::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation_model in conversations {
            let section_model = section::Entity::find_by_id(conversation_model.section_id.clone())
                .one(&self.db)
                .await?;

            summaries.push(ConversationSummary {
                id: parse_id::<ConversationId>(&conversation_model.id, "conversation.id")?,
                user_id: parse_id::<UserId>(&conversation_model.user_id, "conversation.user_id")?,
                section_id: parse_id::<SectionId>(
                    &conversation_model.section_id,
                    "conversation.section_id",
                )?,
                section_title: section_model.map(|s| s.title).unwrap_or_default(),
                role: map_role(conversation_model.role)?,
                created_at: conversation_model.created_at,
                updated_at: conversation_model.updated_at,
            });
        }

        Ok(summaries)
    }

    async fn load_open_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<conversation::Model> {
        let conversation_model = conversation::Entity::find_by_id(conversation_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(ServiceError::ConversationNotFound(conversation_id))?;

        if conversation_model.is_deleted {
            return Err(ServiceError::ConversationDeleted(conversation_id));
        }

        Ok(conversation_model)
    }

    async fn touch_conversation(&self, conversation_model: &conversation::Model) -> Result<()> {
        let mut active: conversation::ActiveModel = conversation_model.clone().into();
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Assemble the provider request: resolved config, section text, the
    /// hidden solution and the transcript so far (minus the message being
    /// answered, which is framed separately).
    async fn resolve_request(
        &self,
        conversation_model: &conversation::Model,
        content: &str,
        kind: &MessageKind,
        current_message_id: MessageId,
    ) -> Result<LlmRequest> {
        let section_model = section::Entity::find_by_id(conversation_model.section_id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::Corrupt(format!(
                    "conversation {} references a missing section",
                    conversation_model.id
                ))
            })?;
        let homework_model = homework::Entity::find_by_id(section_model.homework_id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::Corrupt(format!(
                    "section {} references a missing homework",
                    section_model.id
                ))
            })?;

        let config = self.resolve_config(&homework_model).await?;

        let solution = section_solution::Entity::find()
            .filter(section_solution::Column::SectionId.eq(section_model.id.clone()))
            .one(&self.db)
            .await?
            .map(|s| s.content);

        let transcript: Vec<TranscriptMessage> = message::Entity::find()
            .filter(message::Column::ConversationId.eq(conversation_model.id.clone()))
            .filter(message::Column::Id.ne(current_message_id.to_string()))
            .order_by_asc(message::Column::Timestamp)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| TranscriptMessage {
                kind: MessageKind::parse(&m.kind),
                content: m.content,
            })
            .collect();

        let section_context = SectionContext {
            title: section_model.title,
            content: section_model.content,
            solution,
        };

        let prompt = build_tutor_prompt(&section_context, &transcript, content, kind);

        let max_tokens = u32::try_from(config.max_tokens).map_err(|_| {
            ServiceError::Corrupt(format!(
                "invalid llm_config.max_tokens from database: {}",
                config.max_tokens
            ))
        })?;

        Ok(LlmRequest {
            model: config.model_name,
            api_key: config.api_key,
            base_prompt: config.base_prompt,
            prompt,
            temperature: Temperature::new(config.temperature)?,
            max_tokens,
        })
    }

    /// Homework-pinned config first, the active default otherwise.
    async fn resolve_config(&self, homework_model: &homework::Model) -> Result<llm_config::Model> {
        if let Some(config_id) = &homework_model.llm_config_id
            && let Some(config) = llm_config::Entity::find_by_id(config_id.clone())
                .one(&self.db)
                .await?
        {
            return Ok(config);
        }

        find_default_config(&self.db)
            .await?
            .ok_or(ServiceError::NoLlmConfig)
    }
}

async fn insert_message<C: ConnectionTrait>(
    db: &C,
    conversation_id: ConversationId,
    message_id: MessageId,
    content: String,
    kind: &MessageKind,
    timestamp: NaiveDateTime,
) -> Result<()> {
    message::ActiveModel {
        id: Set(message_id.to_string()),
        conversation_id: Set(conversation_id.to_string()),
        content: Set(content),
        kind: Set(kind.as_str().to_string()),
        timestamp: Set(timestamp),
    }
    .insert(db)
    .await?;

    Ok(())
}

/// A timestamp strictly after `earlier`, even when the clock has not
/// advanced, so paired messages keep their relative order.
fn after(earlier: NaiveDateTime) -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    if now > earlier {
        now
    } else {
        earlier + Duration::microseconds(1)
    }
}

fn map_message(model: message::Model) -> Result<MessageData> {
    let kind = MessageKind::parse(&model.kind);

    Ok(MessageData {
        id: parse_id::<MessageId>(&model.id, "message.id")?,
        content: model.content,
        is_from_student: kind.is_from_student(),
        is_from_ai: kind.is_from_ai(),
        is_system: kind.is_system(),
        kind,
        timestamp: model.timestamp,
    })
}

pub(crate) fn map_role(code: i16) -> Result<ConversationRole> {
    match code {
        0 => Ok(ConversationRole::Student),
        1 => Ok(ConversationRole::TeacherTest),
        _ => Err(ServiceError::Corrupt(format!(
            "invalid conversation.role code from database: {code}"
        ))),
    }
}

pub(crate) fn map_role_code(role: ConversationRole) -> i16 {
    match role {
        ConversationRole::Student => 0,
        ConversationRole::TeacherTest => 1,
    }
}
