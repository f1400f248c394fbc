use std::collections::HashSet;
use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info;
use tutorium_core::domain::{
    ConversationId, HomeworkId, LlmConfigId, SectionId, SectionOrder, SectionStatus, SolutionId,
    TeacherId, UserId,
};

use crate::entity::{conversation, homework, section, section_solution, submission};
use crate::service::error::{Result, ServiceError};

#[derive(Debug, Clone)]
pub struct NewSection {
    pub title: String,
    pub content: String,
    pub order: u8,
    pub solution: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHomework {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDateTime,
    pub llm_config_id: Option<LlmConfigId>,
    pub sections: Vec<NewSection>,
}

#[derive(Debug, Clone)]
pub struct HomeworkCreated {
    pub homework_id: HomeworkId,
    pub section_ids: Vec<SectionId>,
}

#[derive(Debug, Clone)]
pub struct SectionDetail {
    pub id: SectionId,
    pub title: String,
    pub content: String,
    pub order: SectionOrder,
    pub has_solution: bool,
    /// Present only for teacher-facing views; student projections drop it.
    pub solution: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct HomeworkDetail {
    pub id: HomeworkId,
    pub teacher_id: TeacherId,
    pub llm_config_id: Option<LlmConfigId>,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub sections: Vec<SectionDetail>,
}

#[derive(Debug, Clone)]
pub struct SectionUpdate {
    pub id: SectionId,
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<u8>,
    /// `Some(None)` removes an existing solution.
    pub solution: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct HomeworkUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    /// `Some(None)` detaches the config.
    pub llm_config_id: Option<Option<LlmConfigId>>,
    pub sections_to_create: Vec<NewSection>,
    pub sections_to_update: Vec<SectionUpdate>,
    pub sections_to_delete: Vec<SectionId>,
}

#[derive(Debug, Clone)]
pub struct HomeworkUpdated {
    pub homework_id: HomeworkId,
    pub updated_section_ids: Vec<SectionId>,
    pub created_section_ids: Vec<SectionId>,
    pub deleted_section_ids: Vec<SectionId>,
}

#[derive(Debug, Clone)]
pub struct SectionProgress {
    pub section_id: SectionId,
    pub title: String,
    pub order: SectionOrder,
    pub status: SectionStatus,
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Clone)]
pub struct HomeworkProgress {
    pub homework_id: HomeworkId,
    pub sections: Vec<SectionProgress>,
}

#[derive(Clone)]
pub struct HomeworkService {
    db: DatabaseConnection,
}

impl HomeworkService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a homework and all of its sections as one unit. Any
    /// validation or insert failure rolls the whole creation back.
    #[tracing::instrument(skip(self, data))]
    pub async fn create_homework_with_sections(
        &self,
        data: NewHomework,
        teacher_id: TeacherId,
    ) -> Result<HomeworkCreated> {
        if data.title.trim().is_empty() {
            return Err(ServiceError::EmptyTitle);
        }

        let mut seen_orders = HashSet::new();
        for section_data in &data.sections {
            SectionOrder::new(section_data.order)?;
            if !seen_orders.insert(section_data.order) {
                return Err(ServiceError::DuplicateSectionOrder(section_data.order));
            }
        }

        let homework_id = HomeworkId::new();
        let now = Utc::now().naive_utc();

        let txn = self.db.begin().await?;

        homework::ActiveModel {
            id: Set(homework_id.to_string()),
            teacher_id: Set(teacher_id.to_string()),
            llm_config_id: Set(data.llm_config_id.map(|id| id.to_string())),
            title: Set(data.title),
            description: Set(data.description),
            due_date: Set(data.due_date),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut section_ids = Vec::with_capacity(data.sections.len());
        for section_data in data.sections {
            let section_id =
                Self::insert_section(&txn, homework_id, section_data, now).await?;
            section_ids.push(section_id);
        }

        txn.commit().await?;

        info!(
            homework_id = %homework_id,
            section_count = section_ids.len(),
            "created homework with sections"
        );

        Ok(HomeworkCreated {
            homework_id,
            section_ids,
        })
    }

    pub async fn get_homework_with_sections(
        &self,
        homework_id: HomeworkId,
    ) -> Result<Option<HomeworkDetail>> {
        let Some(model) = homework::Entity::find_by_id(homework_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let sections = section::Entity::find()
            .filter(section::Column::HomeworkId.eq(homework_id.to_string()))
            .order_by_asc(section::Column::Order)
            .all(&self.db)
            .await?;

        let mut section_details = Vec::with_capacity(sections.len());
        for section_model in sections {
            let solution = section_solution::Entity::find()
                .filter(section_solution::Column::SectionId.eq(section_model.id.clone()))
                .one(&self.db)
                .await?;
            section_details.push(Self::map_section(section_model, solution)?);
        }

        Ok(Some(HomeworkDetail {
            id: homework_id,
            teacher_id: parse_id::<TeacherId>(&model.teacher_id, "homework.teacher_id")?,
            llm_config_id: model
                .llm_config_id
                .as_deref()
                .map(|raw| parse_id::<LlmConfigId>(raw, "homework.llm_config_id"))
                .transpose()?,
            title: model.title,
            description: model.description,
            due_date: model.due_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
            sections: section_details,
        }))
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_homework(
        &self,
        homework_id: HomeworkId,
        update: HomeworkUpdate,
    ) -> Result<HomeworkUpdated> {
        let model = homework::Entity::find_by_id(homework_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(ServiceError::HomeworkNotFound(homework_id))?;

        if let Some(title) = &update.title
            && title.trim().is_empty()
        {
            return Err(ServiceError::EmptyTitle);
        }
        for section_data in &update.sections_to_create {
            SectionOrder::new(section_data.order)?;
        }
        for section_update in &update.sections_to_update {
            if let Some(order) = section_update.order {
                SectionOrder::new(order)?;
            }
        }

        let now = Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let mut active: homework::ActiveModel = model.into();
        if let Some(title) = update.title {
            active.title = Set(title);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(due_date) = update.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(llm_config_id) = update.llm_config_id {
            active.llm_config_id = Set(llm_config_id.map(|id| id.to_string()));
        }
        active.updated_at = Set(now);
        active.update(&txn).await?;

        let mut deleted_section_ids = Vec::new();
        for section_id in update.sections_to_delete {
            let result = section::Entity::delete_by_id(section_id.to_string())
                .exec(&txn)
                .await?;
            if result.rows_affected > 0 {
                deleted_section_ids.push(section_id);
            }
        }

        let mut created_section_ids = Vec::new();
        for section_data in update.sections_to_create {
            let section_id = Self::insert_section(&txn, homework_id, section_data, now).await?;
            created_section_ids.push(section_id);
        }

        let mut updated_section_ids = Vec::new();
        for section_update in update.sections_to_update {
            if Self::apply_section_update(&txn, homework_id, &section_update, now).await? {
                updated_section_ids.push(section_update.id);
            }
        }

        txn.commit().await?;

        Ok(HomeworkUpdated {
            homework_id,
            updated_section_ids,
            created_section_ids,
            deleted_section_ids,
        })
    }

    /// Cascades to sections, solutions, conversations and submissions.
    #[tracing::instrument(skip(self))]
    pub async fn delete_homework(&self, homework_id: HomeworkId) -> Result<bool> {
        let result = homework::Entity::delete_by_id(homework_id.to_string())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Section-by-section view of one student's standing on a homework.
    ///
    /// A submission wins over everything else; otherwise a non-deleted
    /// conversation marks the section in progress, and the homework's due
    /// date decides the overdue flavor of either remaining state.
    #[tracing::instrument(skip(self))]
    pub async fn get_student_homework_progress(
        &self,
        user_id: UserId,
        homework_id: HomeworkId,
    ) -> Result<HomeworkProgress> {
        let homework_model = homework::Entity::find_by_id(homework_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(ServiceError::HomeworkNotFound(homework_id))?;
        let is_overdue = homework_model.due_date < Utc::now().naive_utc();

        let sections = section::Entity::find()
            .filter(section::Column::HomeworkId.eq(homework_id.to_string()))
            .order_by_asc(section::Column::Order)
            .all(&self.db)
            .await?;

        let mut progress = Vec::with_capacity(sections.len());
        for section_model in sections {
            let section_id = parse_id::<SectionId>(&section_model.id, "section.id")?;

            let conversations = conversation::Entity::find()
                .filter(conversation::Column::UserId.eq(user_id.to_string()))
                .filter(conversation::Column::SectionId.eq(section_model.id.clone()))
                .filter(conversation::Column::IsDeleted.eq(false))
                .order_by_desc(conversation::Column::CreatedAt)
                .all(&self.db)
                .await?;

            let conversation_ids: Vec<String> =
                conversations.iter().map(|c| c.id.clone()).collect();

            let submitted = if conversation_ids.is_empty() {
                None
            } else {
                submission::Entity::find()
                    .filter(submission::Column::ConversationId.is_in(conversation_ids))
                    .one(&self.db)
                    .await?
            };

            let (status, conversation_id) = if let Some(submitted) = submitted {
                (
                    SectionStatus::Submitted,
                    Some(parse_id::<ConversationId>(
                        &submitted.conversation_id,
                        "submission.conversation_id",
                    )?),
                )
            } else if let Some(latest) = conversations.first() {
                let status = if is_overdue {
                    SectionStatus::InProgressOverdue
                } else {
                    SectionStatus::InProgress
                };
                (
                    status,
                    Some(parse_id::<ConversationId>(&latest.id, "conversation.id")?),
                )
            } else if is_overdue {
                (SectionStatus::Overdue, None)
            } else {
                (SectionStatus::NotStarted, None)
            };

            progress.push(SectionProgress {
                section_id,
                title: section_model.title,
                order: map_order(section_model.order)?,
                status,
                conversation_id,
            });
        }

        Ok(HomeworkProgress {
            homework_id,
            sections: progress,
        })
    }

    async fn insert_section<C: ConnectionTrait>(
        txn: &C,
        homework_id: HomeworkId,
        data: NewSection,
        now: NaiveDateTime,
    ) -> Result<SectionId> {
        let section_id = SectionId::new();

        section::ActiveModel {
            id: Set(section_id.to_string()),
            homework_id: Set(homework_id.to_string()),
            title: Set(data.title),
            content: Set(data.content),
            order: Set(i16::from(data.order)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        if let Some(solution) = data.solution {
            section_solution::ActiveModel {
                id: Set(SolutionId::new().to_string()),
                section_id: Set(section_id.to_string()),
                content: Set(solution),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;
        }

        Ok(section_id)
    }

    async fn apply_section_update<C: ConnectionTrait>(
        txn: &C,
        homework_id: HomeworkId,
        update: &SectionUpdate,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let Some(model) = section::Entity::find_by_id(update.id.to_string())
            .filter(section::Column::HomeworkId.eq(homework_id.to_string()))
            .one(txn)
            .await?
        else {
            return Ok(false);
        };

        let section_key = model.id.clone();
        let mut active: section::ActiveModel = model.into();
        if let Some(title) = &update.title {
            active.title = Set(title.clone());
        }
        if let Some(content) = &update.content {
            active.content = Set(content.clone());
        }
        if let Some(order) = update.order {
            active.order = Set(i16::from(order));
        }
        active.updated_at = Set(now);
        active.update(txn).await?;

        if let Some(solution) = &update.solution {
            let existing = section_solution::Entity::find()
                .filter(section_solution::Column::SectionId.eq(section_key.clone()))
                .one(txn)
                .await?;

            match (solution, existing) {
                (Some(content), Some(existing)) => {
                    let mut active: section_solution::ActiveModel = existing.into();
                    active.content = Set(content.clone());
                    active.updated_at = Set(now);
                    active.update(txn).await?;
                }
                (Some(content), None) => {
                    section_solution::ActiveModel {
                        id: Set(SolutionId::new().to_string()),
                        section_id: Set(section_key),
                        content: Set(content.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                }
                (None, Some(existing)) => {
                    section_solution::Entity::delete_by_id(existing.id)
                        .exec(txn)
                        .await?;
                }
                (None, None) => {}
            }
        }

        Ok(true)
    }

    fn map_section(
        model: section::Model,
        solution: Option<section_solution::Model>,
    ) -> Result<SectionDetail> {
        Ok(SectionDetail {
            id: parse_id::<SectionId>(&model.id, "section.id")?,
            title: model.title,
            content: model.content,
            order: map_order(model.order)?,
            has_solution: solution.is_some(),
            solution: solution.map(|s| s.content),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub(crate) fn parse_id<T: FromStr>(raw: &str, column: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| ServiceError::Corrupt(format!("invalid {column} '{raw}' from database")))
}

pub(crate) fn map_order(code: i16) -> Result<SectionOrder> {
    let value = u8::try_from(code)
        .map_err(|_| ServiceError::Corrupt(format!("invalid section.order from database: {code}")))?;

    SectionOrder::new(value).map_err(Into::into)
}
