use std::collections::HashSet;

use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{info, warn};
use tutorium_core::domain::{
    ConversationId, ConversationRole, HomeworkId, SectionId, SubmissionId, UserId,
};

use crate::entity::{conversation, homework, section, submission, user};
use crate::service::account::profiles_for;
use crate::service::conversation::map_role_code;
use crate::service::error::{Result, ServiceError};
use crate::service::homework::parse_id;

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub submission_id: SubmissionId,
    pub conversation_id: ConversationId,
    pub section_id: SectionId,
    pub is_new: bool,
}

#[derive(Debug, Clone)]
pub struct SubmissionData {
    pub id: SubmissionId,
    pub conversation_id: ConversationId,
    pub section_id: SectionId,
    pub section_title: String,
    pub student_user_id: UserId,
    pub student_name: String,
    pub submitted_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct SectionSweepDetail {
    pub section_id: SectionId,
    pub homework_id: HomeworkId,
    pub students_processed: u32,
    pub submissions_created: u32,
    pub errors: u32,
}

#[derive(Debug, Clone)]
pub struct AutoSubmitReport {
    pub total_sections: u32,
    pub processed_sections: u32,
    pub created_submissions: u32,
    pub error_count: u32,
    pub details: Vec<SectionSweepDetail>,
}

#[derive(Clone)]
pub struct SubmissionService {
    db: DatabaseConnection,
}

impl SubmissionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Mark `conversation_id` as the student's final answer for its
    /// section. One transaction covers the existing-submission lookup and
    /// the write, so two racing submits for the same (student, section)
    /// land on a single row: the first insert wins, the second becomes a
    /// pointer update.
    #[tracing::instrument(skip(self))]
    pub async fn submit_section(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<SubmissionOutcome> {
        let txn = self.db.begin().await?;

        let conversation_model = conversation::Entity::find_by_id(conversation_id.to_string())
            .one(&txn)
            .await?
            .ok_or(ServiceError::ConversationNotFound(conversation_id))?;

        if conversation_model.user_id != user_id.to_string() {
            return Err(ServiceError::ConversationOwnership {
                conversation: conversation_id,
                user: user_id,
            });
        }
        if conversation_model.is_deleted {
            return Err(ServiceError::ConversationDeleted(conversation_id));
        }

        let section_id =
            parse_id::<SectionId>(&conversation_model.section_id, "conversation.section_id")?;

        let existing =
            find_submission_for(&txn, user_id, &conversation_model.section_id).await?;

        let outcome = match existing {
            Some(existing) => {
                let submission_id = parse_id::<SubmissionId>(&existing.id, "submission.id")?;
                let mut active: submission::ActiveModel = existing.into();
                active.conversation_id = Set(conversation_id.to_string());
                active.submitted_at = Set(Utc::now().naive_utc());
                active.update(&txn).await?;

                SubmissionOutcome {
                    submission_id,
                    conversation_id,
                    section_id,
                    is_new: false,
                }
            }
            None => {
                let submission_id = SubmissionId::new();
                submission::ActiveModel {
                    id: Set(submission_id.to_string()),
                    conversation_id: Set(conversation_id.to_string()),
                    submitted_at: Set(Utc::now().naive_utc()),
                }
                .insert(&txn)
                .await?;

                SubmissionOutcome {
                    submission_id,
                    conversation_id,
                    section_id,
                    is_new: true,
                }
            }
        };

        txn.commit().await?;

        info!(
            submission_id = %outcome.submission_id,
            conversation_id = %conversation_id,
            is_new = outcome.is_new,
            "submitted section"
        );

        Ok(outcome)
    }

    /// Finalize every overdue section for students who never submitted:
    /// their most recent conversation becomes the submission. Students
    /// with no conversation are skipped. Re-running only touches students
    /// still lacking a submission, so the sweep is idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn auto_submit_overdue_sections(&self) -> Result<AutoSubmitReport> {
        let now = Utc::now().naive_utc();

        let overdue_homeworks = homework::Entity::find()
            .filter(homework::Column::DueDate.lt(now))
            .all(&self.db)
            .await?;

        let mut report = AutoSubmitReport {
            total_sections: 0,
            processed_sections: 0,
            created_submissions: 0,
            error_count: 0,
            details: Vec::new(),
        };

        for homework_model in overdue_homeworks {
            let homework_id = parse_id::<HomeworkId>(&homework_model.id, "homework.id")?;
            let sections = section::Entity::find()
                .filter(section::Column::HomeworkId.eq(homework_model.id.clone()))
                .order_by_asc(section::Column::Order)
                .all(&self.db)
                .await?;

            for section_model in sections {
                report.total_sections += 1;
                report.processed_sections += 1;

                let mut detail = SectionSweepDetail {
                    section_id: parse_id::<SectionId>(&section_model.id, "section.id")?,
                    homework_id,
                    students_processed: 0,
                    submissions_created: 0,
                    errors: 0,
                };

                // Newest first, so the first conversation seen per user is
                // the one to submit.
                let conversations = conversation::Entity::find()
                    .filter(conversation::Column::SectionId.eq(section_model.id.clone()))
                    .filter(conversation::Column::IsDeleted.eq(false))
                    .filter(
                        conversation::Column::Role
                            .eq(map_role_code(ConversationRole::Student)),
                    )
                    .order_by_desc(conversation::Column::CreatedAt)
                    .all(&self.db)
                    .await?;

                let mut seen_users = HashSet::new();
                for conversation_model in conversations {
                    if !seen_users.insert(conversation_model.user_id.clone()) {
                        continue;
                    }

                    let user_id =
                        parse_id::<UserId>(&conversation_model.user_id, "conversation.user_id")?;

                    let (_, has_student) = profiles_for(&self.db, user_id).await?;
                    if !has_student {
                        continue;
                    }

                    if find_submission_for(&self.db, user_id, &section_model.id)
                        .await?
                        .is_some()
                    {
                        continue;
                    }

                    detail.students_processed += 1;

                    let conversation_id = parse_id::<ConversationId>(
                        &conversation_model.id,
                        "conversation.id",
                    )?;
                    match self.submit_section(user_id, conversation_id).await {
                        Ok(outcome) if outcome.is_new => {
                            detail.submissions_created += 1;
                            report.created_submissions += 1;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(
                                conversation_id = %conversation_id,
                                error = %err,
                                "auto-submit failed for conversation"
                            );
                            detail.errors += 1;
                            report.error_count += 1;
                        }
                    }
                }

                report.details.push(detail);
            }
        }

        info!(
            total_sections = report.total_sections,
            created_submissions = report.created_submissions,
            error_count = report.error_count,
            "auto-submit sweep finished"
        );

        Ok(report)
    }

    pub async fn get_student_submissions(&self, user_id: UserId) -> Result<Vec<SubmissionData>> {
        let conversations = conversation::Entity::find()
            .filter(conversation::Column::UserId.eq(user_id.to_string()))
            .all(&self.db)
            .await?;

        if conversations.is_empty() {
            return Ok(Vec::new());
        }

        let conversation_ids: Vec<String> = conversations.iter().map(|c| c.id.clone()).collect();
        let submissions = submission::Entity::find()
            .filter(submission::Column::ConversationId.is_in(conversation_ids))
            .order_by_desc(submission::Column::SubmittedAt)
            .all(&self.db)
            .await?;

        let mut data = Vec::with_capacity(submissions.len());
        for submission_model in submissions {
            data.push(self.map_submission(submission_model).await?);
        }

        Ok(data)
    }

    pub async fn get_submission_data(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<SubmissionData>> {
        let Some(submission_model) = submission::Entity::find_by_id(submission_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        self.map_submission(submission_model).await.map(Some)
    }

    async fn map_submission(&self, submission_model: submission::Model) -> Result<SubmissionData> {
        let conversation_model =
            conversation::Entity::find_by_id(submission_model.conversation_id.clone())
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::Corrupt(format!(
                        "submission {} references a missing conversation",
                        submission_model.id
                    ))
                })?;

        let section_model = section::Entity::find_by_id(conversation_model.section_id.clone())
            .one(&self.db)
            .await?;

        let user_model = user::Entity::find_by_id(conversation_model.user_id.clone())
            .one(&self.db)
            .await?;

        let student_name = user_model
            .map(|u| {
                let full_name = format!(
                    "{} {}",
                    u.first_name.unwrap_or_default(),
                    u.last_name.unwrap_or_default()
                );
                if full_name.trim().is_empty() {
                    u.username
                } else {
                    full_name.trim().to_string()
                }
            })
            .unwrap_or_default();

        Ok(SubmissionData {
            id: parse_id::<SubmissionId>(&submission_model.id, "submission.id")?,
            conversation_id: parse_id::<ConversationId>(
                &submission_model.conversation_id,
                "submission.conversation_id",
            )?,
            section_id: parse_id::<SectionId>(
                &conversation_model.section_id,
                "conversation.section_id",
            )?,
            section_title: section_model.map(|s| s.title).unwrap_or_default(),
            student_user_id: parse_id::<UserId>(
                &conversation_model.user_id,
                "conversation.user_id",
            )?,
            student_name,
            submitted_at: submission_model.submitted_at,
        })
    }
}

/// Any submission for the (user, section) pair, reached through the
/// user's conversations on that section.
async fn find_submission_for<C: ConnectionTrait>(
    db: &C,
    user_id: UserId,
    section_key: &str,
) -> Result<Option<submission::Model>> {
    let conversations = conversation::Entity::find()
        .filter(conversation::Column::UserId.eq(user_id.to_string()))
        .filter(conversation::Column::SectionId.eq(section_key))
        .all(db)
        .await?;

    if conversations.is_empty() {
        return Ok(None);
    }

    let conversation_ids: Vec<String> = conversations.into_iter().map(|c| c.id).collect();
    let existing = submission::Entity::find()
        .filter(submission::Column::ConversationId.is_in(conversation_ids))
        .one(db)
        .await?;

    Ok(existing)
}
