//! Conversation endpoints: start, inspect, send, record sandbox runs.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tutorium_api_types::{CodeExecutionRequest, SendMessageRequest};
use tutorium_core::domain::{ConversationId, MessageKind, SectionId, UserId};

use super::error::{ApiError, parse_path_id};
use super::state::AppState;
use crate::service::ConversationData;

pub fn create_conversation_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sections/{id}/conversations", post(start_conversation))
        .route(
            "/api/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/api/conversations/{id}/messages", post(send_message))
        .route(
            "/api/conversations/{id}/code-execution",
            post(record_code_execution),
        )
        .route(
            "/api/teachers/{user_id}/test-conversations",
            get(list_teacher_test_conversations),
        )
}

#[derive(Debug, Deserialize)]
struct StartConversationRequest {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct ConversationStartedResponse {
    conversation_id: String,
    initial_message_id: String,
}

async fn start_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<StartConversationRequest>,
) -> Result<Json<ConversationStartedResponse>, ApiError> {
    let section_id = parse_path_id::<SectionId>(&id, "section id")?;
    let user_id = parse_path_id::<UserId>(&payload.user_id, "user id")?;

    let started = state
        .conversations
        .start_conversation(user_id, section_id)
        .await?;

    Ok(Json(ConversationStartedResponse {
        conversation_id: started.conversation_id.to_string(),
        initial_message_id: started.initial_message_id.to_string(),
    }))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    id: String,
    content: String,
    kind: String,
    timestamp: NaiveDateTime,
    is_from_student: bool,
    is_from_ai: bool,
    is_system: bool,
}

#[derive(Debug, Serialize)]
struct ConversationResponse {
    id: String,
    user_id: String,
    section_id: String,
    section_title: String,
    homework_id: String,
    homework_title: String,
    is_teacher_test: bool,
    can_submit: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    messages: Vec<MessageResponse>,
}

impl From<ConversationData> for ConversationResponse {
    fn from(data: ConversationData) -> Self {
        Self {
            id: data.id.to_string(),
            user_id: data.user_id.to_string(),
            section_id: data.section_id.to_string(),
            section_title: data.section_title,
            homework_id: data.homework_id.to_string(),
            homework_title: data.homework_title,
            is_teacher_test: data.role.is_teacher_test(),
            can_submit: data.can_submit,
            created_at: data.created_at,
            updated_at: data.updated_at,
            messages: data
                .messages
                .into_iter()
                .map(|m| MessageResponse {
                    id: m.id.to_string(),
                    content: m.content,
                    kind: m.kind.as_str().to_string(),
                    timestamp: m.timestamp,
                    is_from_student: m.is_from_student,
                    is_from_ai: m.is_from_ai,
                    is_system: m.is_system,
                })
                .collect(),
        }
    }
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation_id = parse_path_id::<ConversationId>(&id, "conversation id")?;

    let data = state
        .conversations
        .get_conversation_data(conversation_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(
                format!("conversation not found: {id}"),
                "CONVERSATION_NOT_FOUND",
            )
        })?;

    Ok(Json(ConversationResponse::from(data)))
}

#[derive(Debug, Serialize)]
struct MessageSentResponse {
    user_message_id: String,
    ai_message_id: String,
    ai_response: String,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<MessageSentResponse>, ApiError> {
    let conversation_id = parse_path_id::<ConversationId>(&id, "conversation id")?;
    let kind = payload
        .kind
        .as_deref()
        .map(MessageKind::parse)
        .unwrap_or(MessageKind::Student);

    let sent = state
        .conversations
        .send_message(conversation_id, payload.content, kind)
        .await?;

    Ok(Json(MessageSentResponse {
        user_message_id: sent.user_message_id.to_string(),
        ai_message_id: sent.ai_message_id.to_string(),
        ai_response: sent.ai_response,
    }))
}

#[derive(Debug, Serialize)]
struct CodeExecutionResponse {
    code_message_id: String,
    result_message_id: String,
    has_error: bool,
}

async fn record_code_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CodeExecutionRequest>,
) -> Result<Json<CodeExecutionResponse>, ApiError> {
    let conversation_id = parse_path_id::<ConversationId>(&id, "conversation id")?;

    let recorded = state
        .conversations
        .handle_code_execution(conversation_id, payload.code, payload.output, payload.error)
        .await?;

    Ok(Json(CodeExecutionResponse {
        code_message_id: recorded.code_message_id.to_string(),
        result_message_id: recorded.result_message_id.to_string(),
        has_error: recorded.has_error,
    }))
}

async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conversation_id = parse_path_id::<ConversationId>(&id, "conversation id")?;

    state
        .conversations
        .delete_teacher_test_conversation(conversation_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct TestConversationQuery {
    #[serde(default)]
    section_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConversationSummaryResponse {
    id: String,
    user_id: String,
    section_id: String,
    section_title: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

async fn list_teacher_test_conversations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<TestConversationQuery>,
) -> Result<Json<Vec<ConversationSummaryResponse>>, ApiError> {
    let user_id = parse_path_id::<UserId>(&user_id, "user id")?;
    let section_id = query
        .section_id
        .as_deref()
        .map(|raw| parse_path_id::<SectionId>(raw, "section id"))
        .transpose()?;

    let summaries = state
        .conversations
        .get_teacher_test_conversations(user_id, section_id)
        .await?;

    Ok(Json(
        summaries
            .into_iter()
            .map(|s| ConversationSummaryResponse {
                id: s.id.to_string(),
                user_id: s.user_id.to_string(),
                section_id: s.section_id.to_string(),
                section_title: s.section_title,
                created_at: s.created_at,
                updated_at: s.updated_at,
            })
            .collect(),
    ))
}
