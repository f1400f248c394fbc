//! Homework CRUD and progress endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tutorium_core::domain::{HomeworkId, LlmConfigId, SectionId, TeacherId, UserId};

use super::error::{ApiError, parse_path_id};
use super::state::AppState;
use crate::service::{HomeworkUpdate, NewHomework, NewSection, SectionUpdate};

pub fn create_homework_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/homeworks", post(create_homework))
        .route(
            "/api/homeworks/{id}",
            get(get_homework).put(update_homework).delete(delete_homework),
        )
        .route("/api/homeworks/{id}/progress", get(get_progress))
}

#[derive(Debug, Deserialize)]
struct SectionPayload {
    title: String,
    content: String,
    order: u8,
    #[serde(default)]
    solution: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateHomeworkRequest {
    teacher_id: String,
    title: String,
    description: String,
    due_date: NaiveDateTime,
    #[serde(default)]
    llm_config_id: Option<String>,
    sections: Vec<SectionPayload>,
}

#[derive(Debug, Serialize)]
struct HomeworkCreatedResponse {
    homework_id: String,
    section_ids: Vec<String>,
}

async fn create_homework(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateHomeworkRequest>,
) -> Result<Json<HomeworkCreatedResponse>, ApiError> {
    let teacher_id = parse_path_id::<TeacherId>(&payload.teacher_id, "teacher id")?;
    let llm_config_id = payload
        .llm_config_id
        .as_deref()
        .map(|raw| parse_path_id::<LlmConfigId>(raw, "llm config id"))
        .transpose()?;

    let created = state
        .homeworks
        .create_homework_with_sections(
            NewHomework {
                title: payload.title,
                description: payload.description,
                due_date: payload.due_date,
                llm_config_id,
                sections: payload
                    .sections
                    .into_iter()
                    .map(|s| NewSection {
                        title: s.title,
                        content: s.content,
                        order: s.order,
                        solution: s.solution,
                    })
                    .collect(),
            },
            teacher_id,
        )
        .await?;

    Ok(Json(HomeworkCreatedResponse {
        homework_id: created.homework_id.to_string(),
        section_ids: created.section_ids.iter().map(|id| id.to_string()).collect(),
    }))
}

#[derive(Debug, Serialize)]
struct SectionResponse {
    id: String,
    title: String,
    content: String,
    order: u8,
    has_solution: bool,
    solution: Option<String>,
}

#[derive(Debug, Serialize)]
struct HomeworkResponse {
    id: String,
    teacher_id: String,
    llm_config_id: Option<String>,
    title: String,
    description: String,
    due_date: NaiveDateTime,
    sections: Vec<SectionResponse>,
}

async fn get_homework(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HomeworkResponse>, ApiError> {
    let homework_id = parse_path_id::<HomeworkId>(&id, "homework id")?;

    let detail = state
        .homeworks
        .get_homework_with_sections(homework_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("homework not found: {id}"), "HOMEWORK_NOT_FOUND"))?;

    Ok(Json(HomeworkResponse {
        id: detail.id.to_string(),
        teacher_id: detail.teacher_id.to_string(),
        llm_config_id: detail.llm_config_id.map(|id| id.to_string()),
        title: detail.title,
        description: detail.description,
        due_date: detail.due_date,
        sections: detail
            .sections
            .into_iter()
            .map(|s| SectionResponse {
                id: s.id.to_string(),
                title: s.title,
                content: s.content,
                order: s.order.value(),
                has_solution: s.has_solution,
                solution: s.solution,
            })
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct SectionUpdatePayload {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    order: Option<u8>,
    /// Present-and-null removes the solution.
    #[serde(default, deserialize_with = "double_option")]
    solution: Option<Option<String>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct UpdateHomeworkRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_date: Option<NaiveDateTime>,
    #[serde(default)]
    sections_to_create: Vec<SectionPayload>,
    #[serde(default)]
    sections_to_update: Vec<SectionUpdatePayload>,
    #[serde(default)]
    sections_to_delete: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HomeworkUpdatedResponse {
    homework_id: String,
    updated_section_ids: Vec<String>,
    created_section_ids: Vec<String>,
    deleted_section_ids: Vec<String>,
}

async fn update_homework(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateHomeworkRequest>,
) -> Result<Json<HomeworkUpdatedResponse>, ApiError> {
    let homework_id = parse_path_id::<HomeworkId>(&id, "homework id")?;

    let mut sections_to_update = Vec::with_capacity(payload.sections_to_update.len());
    for section_update in payload.sections_to_update {
        sections_to_update.push(SectionUpdate {
            id: parse_path_id::<SectionId>(&section_update.id, "section id")?,
            title: section_update.title,
            content: section_update.content,
            order: section_update.order,
            solution: section_update.solution,
        });
    }

    let mut sections_to_delete = Vec::with_capacity(payload.sections_to_delete.len());
    for raw in payload.sections_to_delete {
        sections_to_delete.push(parse_path_id::<SectionId>(&raw, "section id")?);
    }

    let updated = state
        .homeworks
        .update_homework(
            homework_id,
            HomeworkUpdate {
                title: payload.title,
                description: payload.description,
                due_date: payload.due_date,
                llm_config_id: None,
                sections_to_create: payload
                    .sections_to_create
                    .into_iter()
                    .map(|s| NewSection {
                        title: s.title,
                        content: s.content,
                        order: s.order,
                        solution: s.solution,
                    })
                    .collect(),
                sections_to_update,
                sections_to_delete,
            },
        )
        .await?;

    Ok(Json(HomeworkUpdatedResponse {
        homework_id: updated.homework_id.to_string(),
        updated_section_ids: updated
            .updated_section_ids
            .iter()
            .map(|id| id.to_string())
            .collect(),
        created_section_ids: updated
            .created_section_ids
            .iter()
            .map(|id| id.to_string())
            .collect(),
        deleted_section_ids: updated
            .deleted_section_ids
            .iter()
            .map(|id| id.to_string())
            .collect(),
    }))
}

async fn delete_homework(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let homework_id = parse_path_id::<HomeworkId>(&id, "homework id")?;

    if state.homeworks.delete_homework(homework_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(
            format!("homework not found: {id}"),
            "HOMEWORK_NOT_FOUND",
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ProgressQuery {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct SectionProgressResponse {
    section_id: String,
    title: String,
    order: u8,
    status: &'static str,
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HomeworkProgressResponse {
    homework_id: String,
    sections: Vec<SectionProgressResponse>,
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<HomeworkProgressResponse>, ApiError> {
    let homework_id = parse_path_id::<HomeworkId>(&id, "homework id")?;
    let user_id = parse_path_id::<UserId>(&query.user_id, "user id")?;

    let progress = state
        .homeworks
        .get_student_homework_progress(user_id, homework_id)
        .await?;

    Ok(Json(HomeworkProgressResponse {
        homework_id: progress.homework_id.to_string(),
        sections: progress
            .sections
            .into_iter()
            .map(|s| SectionProgressResponse {
                section_id: s.section_id.to_string(),
                title: s.title,
                order: s.order.value(),
                status: s.status.as_str(),
                conversation_id: s.conversation_id.map(|id| id.to_string()),
            })
            .collect(),
    }))
}
