//! API routing.

pub mod accounts;
pub mod chat;
pub mod conversations;
pub mod error;
pub mod homeworks;
pub mod llm_configs;
pub mod state;
pub mod submissions;

pub use state::AppState;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use tower_http::cors::CorsLayer;
use tutorium_api_types::HealthCheckResponse;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(accounts::create_account_router())
        .merge(homeworks::create_homework_router())
        .merge(conversations::create_conversation_router())
        .merge(chat::create_chat_router())
        .merge(submissions::create_submission_router())
        .merge(llm_configs::create_llm_config_router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}
