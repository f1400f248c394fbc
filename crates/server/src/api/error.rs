use std::str::FromStr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tutorium_api_types::ErrorResponse;

use crate::service::ServiceError;

/// API error type: a stable machine code plus a human message.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub code: String,
    pub status: StatusCode,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, code: &str) -> Self {
        Self {
            message: message.into(),
            code: code.to_string(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn not_found(message: impl Into<String>, code: &str) -> Self {
        Self {
            message: message.into(),
            code: code.to_string(),
            status: StatusCode::NOT_FOUND,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let (code, status) = match &err {
            ServiceError::UserNotFound(_) => ("USER_NOT_FOUND", StatusCode::NOT_FOUND),
            ServiceError::TeacherNotFound(_) => ("TEACHER_NOT_FOUND", StatusCode::NOT_FOUND),
            ServiceError::HomeworkNotFound(_) => ("HOMEWORK_NOT_FOUND", StatusCode::NOT_FOUND),
            ServiceError::SectionNotFound(_) => ("SECTION_NOT_FOUND", StatusCode::NOT_FOUND),
            ServiceError::ConversationNotFound(_) => {
                ("CONVERSATION_NOT_FOUND", StatusCode::NOT_FOUND)
            }
            ServiceError::SubmissionNotFound(_) => ("SUBMISSION_NOT_FOUND", StatusCode::NOT_FOUND),
            ServiceError::LlmConfigNotFound(_) => ("LLM_CONFIG_NOT_FOUND", StatusCode::NOT_FOUND),
            ServiceError::NoLlmConfig => ("NO_LLM_CONFIG", StatusCode::SERVICE_UNAVAILABLE),
            ServiceError::EmptyTitle => ("EMPTY_TITLE", StatusCode::BAD_REQUEST),
            ServiceError::UsernameTaken(_) => ("USERNAME_TAKEN", StatusCode::CONFLICT),
            ServiceError::DuplicateSectionOrder(_) => {
                ("DUPLICATE_SECTION_ORDER", StatusCode::BAD_REQUEST)
            }
            ServiceError::NotATeacherTestConversation(_) => {
                ("NOT_A_TEACHER_TEST", StatusCode::BAD_REQUEST)
            }
            ServiceError::ConversationDeleted(_) => ("CONVERSATION_DELETED", StatusCode::GONE),
            ServiceError::ConversationOwnership { .. } => {
                ("CONVERSATION_OWNERSHIP", StatusCode::FORBIDDEN)
            }
            ServiceError::Domain(_) => ("VALIDATION_FAILED", StatusCode::BAD_REQUEST),
            ServiceError::Llm(_) => ("LLM_FAILED", StatusCode::BAD_GATEWAY),
            ServiceError::Db(_) | ServiceError::Corrupt(_) => {
                ("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        Self {
            message: err.to_string(),
            code: code.to_string(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            code: self.code,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Parse a path/query identifier into its typed form.
pub fn parse_path_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse::<T>()
        .map_err(|_| ApiError::bad_request(format!("invalid {what}: {raw}"), "INVALID_ID"))
}
