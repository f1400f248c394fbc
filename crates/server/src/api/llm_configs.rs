//! Administrative endpoints for model configurations.
//!
//! Responses never include the stored API key.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::put};
use serde::{Deserialize, Serialize};
use tutorium_core::domain::LlmConfigId;

use super::error::{ApiError, parse_path_id};
use super::state::AppState;
use crate::service::{LlmConfigData, LlmConfigUpdate, NewLlmConfig};

pub fn create_llm_config_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/llm-configs", get(list_configs).post(create_config))
        .route("/api/llm-configs/default", get(get_default_config))
        .route("/api/llm-configs/{id}", put(update_config))
}

#[derive(Debug, Serialize)]
struct LlmConfigResponse {
    id: String,
    name: String,
    model_name: String,
    base_prompt: String,
    temperature: f64,
    max_tokens: u32,
    is_default: bool,
    is_active: bool,
}

impl From<LlmConfigData> for LlmConfigResponse {
    fn from(data: LlmConfigData) -> Self {
        Self {
            id: data.id.to_string(),
            name: data.name,
            model_name: data.model_name,
            base_prompt: data.base_prompt,
            temperature: data.temperature.value(),
            max_tokens: data.max_tokens,
            is_default: data.is_default,
            is_active: data.is_active,
        }
    }
}

async fn list_configs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LlmConfigResponse>>, ApiError> {
    let configs = state.llm_configs.list_configs().await?;

    Ok(Json(
        configs.into_iter().map(LlmConfigResponse::from).collect(),
    ))
}

async fn get_default_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LlmConfigResponse>, ApiError> {
    let config = state
        .llm_configs
        .get_default_config()
        .await?
        .ok_or_else(|| {
            ApiError::not_found("no default llm config is configured", "NO_LLM_CONFIG")
        })?;

    Ok(Json(LlmConfigResponse::from(config)))
}

#[derive(Debug, Deserialize)]
struct CreateConfigRequest {
    name: String,
    model_name: String,
    api_key: String,
    base_prompt: String,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default)]
    is_default: bool,
    #[serde(default = "default_is_active")]
    is_active: bool,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_is_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct ConfigCreatedResponse {
    id: String,
}

async fn create_config(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateConfigRequest>,
) -> Result<Json<ConfigCreatedResponse>, ApiError> {
    let config_id = state
        .llm_configs
        .create_config(NewLlmConfig {
            name: payload.name,
            model_name: payload.model_name,
            api_key: payload.api_key,
            base_prompt: payload.base_prompt,
            temperature: payload.temperature,
            max_tokens: payload.max_tokens,
            is_default: payload.is_default,
            is_active: payload.is_active,
        })
        .await?;

    Ok(Json(ConfigCreatedResponse {
        id: config_id.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct UpdateConfigRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model_name: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_prompt: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    is_default: Option<bool>,
    #[serde(default)]
    is_active: Option<bool>,
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateConfigRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config_id = parse_path_id::<LlmConfigId>(&id, "llm config id")?;

    let updated = state
        .llm_configs
        .update_config(
            config_id,
            LlmConfigUpdate {
                name: payload.name,
                model_name: payload.model_name,
                api_key: payload.api_key,
                base_prompt: payload.base_prompt,
                temperature: payload.temperature,
                max_tokens: payload.max_tokens,
                is_default: payload.is_default,
                is_active: payload.is_active,
            },
        )
        .await?;

    if !updated {
        return Err(ApiError::not_found(
            format!("llm config not found: {id}"),
            "LLM_CONFIG_NOT_FOUND",
        ));
    }

    Ok(Json(serde_json::json!({ "updated": true })))
}
