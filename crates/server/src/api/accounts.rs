//! Registration endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;
use crate::service::{AccountRole, NewUser};

pub fn create_account_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/users", post(register_user))
}

#[derive(Debug, Deserialize)]
struct RegisterUserRequest {
    username: String,
    email: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    role: RolePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RolePayload {
    Teacher,
    Student,
}

#[derive(Debug, Serialize)]
struct RegisterUserResponse {
    user_id: String,
    teacher_id: Option<String>,
    student_id: Option<String>,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<RegisterUserResponse>, ApiError> {
    let role = match payload.role {
        RolePayload::Teacher => AccountRole::Teacher,
        RolePayload::Student => AccountRole::Student,
    };

    let registered = state
        .accounts
        .register_user(
            NewUser {
                username: payload.username,
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
            },
            role,
        )
        .await?;

    Ok(Json(RegisterUserResponse {
        user_id: registered.user_id.to_string(),
        teacher_id: registered.teacher_id.map(|id| id.to_string()),
        student_id: registered.student_id.map(|id| id.to_string()),
    }))
}
