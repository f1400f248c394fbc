//! Submission endpoints and the operator-triggered auto-submit sweep.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::post};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tutorium_core::domain::{ConversationId, SubmissionId, UserId};

use super::error::{ApiError, parse_path_id};
use super::state::AppState;
use crate::service::SubmissionData;

pub fn create_submission_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/conversations/{id}/submit", post(submit_section))
        .route("/api/users/{id}/submissions", get(list_student_submissions))
        .route("/api/submissions/{id}", get(get_submission))
        .route("/api/admin/auto-submit", post(auto_submit))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct SubmissionOutcomeResponse {
    submission_id: String,
    conversation_id: String,
    section_id: String,
    is_new: bool,
}

async fn submit_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmissionOutcomeResponse>, ApiError> {
    let conversation_id = parse_path_id::<ConversationId>(&id, "conversation id")?;
    let user_id = parse_path_id::<UserId>(&payload.user_id, "user id")?;

    let outcome = state
        .submissions
        .submit_section(user_id, conversation_id)
        .await?;

    Ok(Json(SubmissionOutcomeResponse {
        submission_id: outcome.submission_id.to_string(),
        conversation_id: outcome.conversation_id.to_string(),
        section_id: outcome.section_id.to_string(),
        is_new: outcome.is_new,
    }))
}

#[derive(Debug, Serialize)]
struct SubmissionResponse {
    id: String,
    conversation_id: String,
    section_id: String,
    section_title: String,
    student_user_id: String,
    student_name: String,
    submitted_at: NaiveDateTime,
}

impl From<SubmissionData> for SubmissionResponse {
    fn from(data: SubmissionData) -> Self {
        Self {
            id: data.id.to_string(),
            conversation_id: data.conversation_id.to_string(),
            section_id: data.section_id.to_string(),
            section_title: data.section_title,
            student_user_id: data.student_user_id.to_string(),
            student_name: data.student_name,
            submitted_at: data.submitted_at,
        }
    }
}

async fn list_student_submissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let user_id = parse_path_id::<UserId>(&id, "user id")?;

    let submissions = state.submissions.get_student_submissions(user_id).await?;

    Ok(Json(
        submissions.into_iter().map(SubmissionResponse::from).collect(),
    ))
}

async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission_id = parse_path_id::<SubmissionId>(&id, "submission id")?;

    let data = state
        .submissions
        .get_submission_data(submission_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("submission not found: {id}"), "SUBMISSION_NOT_FOUND")
        })?;

    Ok(Json(SubmissionResponse::from(data)))
}

#[derive(Debug, Serialize)]
struct SectionSweepResponse {
    section_id: String,
    homework_id: String,
    students_processed: u32,
    submissions_created: u32,
    errors: u32,
}

#[derive(Debug, Serialize)]
struct AutoSubmitResponse {
    total_sections: u32,
    processed_sections: u32,
    created_submissions: u32,
    error_count: u32,
    details: Vec<SectionSweepResponse>,
}

async fn auto_submit(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AutoSubmitResponse>, ApiError> {
    let report = state.submissions.auto_submit_overdue_sections().await?;

    Ok(Json(AutoSubmitResponse {
        total_sections: report.total_sections,
        processed_sections: report.processed_sections,
        created_submissions: report.created_submissions,
        error_count: report.error_count,
        details: report
            .details
            .into_iter()
            .map(|d| SectionSweepResponse {
                section_id: d.section_id.to_string(),
                homework_id: d.homework_id.to_string(),
                students_processed: d.students_processed,
                submissions_created: d.submissions_created,
                errors: d.errors,
            })
            .collect(),
    }))
}
