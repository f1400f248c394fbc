use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::info;
use tutorium_core::domain::{LlmConfigId, Temperature};

use crate::entity::llm_config;
use crate::service::error::{Result, ServiceError};
use crate::service::homework::parse_id;

#[derive(Debug, Clone)]
pub struct LlmConfigData {
    pub id: LlmConfigId,
    pub name: String,
    pub model_name: String,
    pub api_key: String,
    pub base_prompt: String,
    pub temperature: Temperature,
    pub max_tokens: u32,
    pub is_default: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewLlmConfig {
    pub name: String,
    pub model_name: String,
    pub api_key: String,
    pub base_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub is_default: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LlmConfigUpdate {
    pub name: Option<String>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub base_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct LlmConfigService {
    db: DatabaseConnection,
}

impl LlmConfigService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_default_config(&self) -> Result<Option<LlmConfigData>> {
        let model = find_default_config(&self.db).await?;
        model.map(map_config).transpose()
    }

    pub async fn get_config(&self, config_id: LlmConfigId) -> Result<Option<LlmConfigData>> {
        let model = llm_config::Entity::find_by_id(config_id.to_string())
            .one(&self.db)
            .await?;
        model.map(map_config).transpose()
    }

    pub async fn list_configs(&self) -> Result<Vec<LlmConfigData>> {
        let models = llm_config::Entity::find().all(&self.db).await?;
        models.into_iter().map(map_config).collect()
    }

    /// Making a config the default clears the flag everywhere else in the
    /// same transaction, keeping at most one default at any point.
    #[tracing::instrument(skip(self, data))]
    pub async fn create_config(&self, data: NewLlmConfig) -> Result<LlmConfigId> {
        Temperature::new(data.temperature)?;

        let config_id = LlmConfigId::new();
        let now = Utc::now().naive_utc();

        let txn = self.db.begin().await?;

        if data.is_default {
            clear_defaults(&txn, None).await?;
        }

        llm_config::ActiveModel {
            id: Set(config_id.to_string()),
            name: Set(data.name),
            model_name: Set(data.model_name),
            api_key: Set(data.api_key),
            base_prompt: Set(data.base_prompt),
            temperature: Set(data.temperature),
            max_tokens: Set(i32::try_from(data.max_tokens).map_err(|_| {
                ServiceError::Corrupt(format!("max_tokens out of range: {}", data.max_tokens))
            })?),
            is_default: Set(data.is_default),
            is_active: Set(data.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(config_id = %config_id, "created llm config");
        Ok(config_id)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_config(
        &self,
        config_id: LlmConfigId,
        update: LlmConfigUpdate,
    ) -> Result<bool> {
        if let Some(temperature) = update.temperature {
            Temperature::new(temperature)?;
        }

        let txn = self.db.begin().await?;

        let Some(model) = llm_config::Entity::find_by_id(config_id.to_string())
            .one(&txn)
            .await?
        else {
            return Ok(false);
        };

        if update.is_default == Some(true) {
            clear_defaults(&txn, Some(&model.id)).await?;
        }

        let mut active: llm_config::ActiveModel = model.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(model_name) = update.model_name {
            active.model_name = Set(model_name);
        }
        if let Some(api_key) = update.api_key {
            active.api_key = Set(api_key);
        }
        if let Some(base_prompt) = update.base_prompt {
            active.base_prompt = Set(base_prompt);
        }
        if let Some(temperature) = update.temperature {
            active.temperature = Set(temperature);
        }
        if let Some(max_tokens) = update.max_tokens {
            active.max_tokens = Set(i32::try_from(max_tokens).map_err(|_| {
                ServiceError::Corrupt(format!("max_tokens out of range: {max_tokens}"))
            })?);
        }
        if let Some(is_default) = update.is_default {
            active.is_default = Set(is_default);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(&txn).await?;

        txn.commit().await?;

        Ok(true)
    }
}

/// The row serving as the platform default: flagged and still active.
pub(crate) async fn find_default_config<C: ConnectionTrait>(
    db: &C,
) -> Result<Option<llm_config::Model>> {
    let model = llm_config::Entity::find()
        .filter(llm_config::Column::IsDefault.eq(true))
        .filter(llm_config::Column::IsActive.eq(true))
        .one(db)
        .await?;

    Ok(model)
}

async fn clear_defaults<C: ConnectionTrait>(db: &C, except_id: Option<&str>) -> Result<()> {
    let mut query = llm_config::Entity::update_many()
        .col_expr(llm_config::Column::IsDefault, Expr::value(false))
        .filter(llm_config::Column::IsDefault.eq(true));

    if let Some(except_id) = except_id {
        query = query.filter(llm_config::Column::Id.ne(except_id));
    }

    query.exec(db).await?;
    Ok(())
}

fn map_config(model: llm_config::Model) -> Result<LlmConfigData> {
    let max_tokens = u32::try_from(model.max_tokens).map_err(|_| {
        ServiceError::Corrupt(format!(
            "invalid llm_config.max_tokens from database: {}",
            model.max_tokens
        ))
    })?;

    Ok(LlmConfigData {
        id: parse_id::<LlmConfigId>(&model.id, "llm_config.id")?,
        name: model.name,
        model_name: model.model_name,
        api_key: model.api_key,
        base_prompt: model.base_prompt,
        temperature: Temperature::new(model.temperature)?,
        max_tokens,
        is_default: model.is_default,
        is_active: model.is_active,
    })
}
