use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::info;
use tutorium_core::domain::{StudentId, TeacherId, UserId};

use crate::entity::{student, teacher, user};
use crate::service::error::{Result, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Teacher,
    Student,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user_id: UserId,
    pub teacher_id: Option<TeacherId>,
    pub student_id: Option<StudentId>,
}

#[derive(Clone)]
pub struct AccountService {
    db: DatabaseConnection,
}

impl AccountService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a user together with exactly one role profile. The profile
    /// is attached in the same transaction, so a registered user never
    /// exists without one and never gains a second.
    #[tracing::instrument(skip(self, new_user))]
    pub async fn register_user(
        &self,
        new_user: NewUser,
        role: AccountRole,
    ) -> Result<RegisteredUser> {
        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(new_user.username.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::UsernameTaken(new_user.username));
        }

        let user_id = UserId::new();
        let now = Utc::now().naive_utc();

        let txn = self.db.begin().await?;

        user::ActiveModel {
            id: Set(user_id.to_string()),
            username: Set(new_user.username),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut registered = RegisteredUser {
            user_id,
            teacher_id: None,
            student_id: None,
        };

        match role {
            AccountRole::Teacher => {
                let teacher_id = TeacherId::new();
                teacher::ActiveModel {
                    id: Set(teacher_id.to_string()),
                    user_id: Set(user_id.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
                registered.teacher_id = Some(teacher_id);
            }
            AccountRole::Student => {
                let student_id = StudentId::new();
                student::ActiveModel {
                    id: Set(student_id.to_string()),
                    user_id: Set(user_id.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
                registered.student_id = Some(student_id);
            }
        }

        txn.commit().await?;

        info!(user_id = %user_id, role = ?role, "registered user");
        Ok(registered)
    }
}

/// Look up which profiles a user carries.
pub(crate) async fn profiles_for<C: ConnectionTrait>(
    db: &C,
    user_id: UserId,
) -> Result<(bool, bool)> {
    let has_teacher = teacher::Entity::find()
        .filter(teacher::Column::UserId.eq(user_id.to_string()))
        .one(db)
        .await?
        .is_some();
    let has_student = student::Entity::find()
        .filter(student::Column::UserId.eq(user_id.to_string()))
        .one(db)
        .await?
        .is_some();

    Ok((has_teacher, has_student))
}
