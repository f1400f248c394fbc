use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(string_len(User::Id, 36).primary_key())
                    .col(string_len(User::Username, 150).unique_key())
                    .col(string_len(User::Email, 255).unique_key())
                    .col(string_len_null(User::FirstName, 150))
                    .col(string_len_null(User::LastName, 150))
                    .col(timestamp(User::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(User::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Teacher::Table)
                    .if_not_exists()
                    .col(string_len(Teacher::Id, 36).primary_key())
                    .col(string_len(Teacher::UserId, 36).unique_key())
                    .col(timestamp(Teacher::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Teacher::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-teachers-user_id")
                            .from(Teacher::Table, Teacher::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Student::Table)
                    .if_not_exists()
                    .col(string_len(Student::Id, 36).primary_key())
                    .col(string_len(Student::UserId, 36).unique_key())
                    .col(timestamp(Student::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Student::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-students-user_id")
                            .from(Student::Table, Student::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LlmConfig::Table)
                    .if_not_exists()
                    .col(string_len(LlmConfig::Id, 36).primary_key())
                    .col(string_len(LlmConfig::Name, 100).unique_key())
                    .col(string_len(LlmConfig::ModelName, 100))
                    .col(string_len(LlmConfig::ApiKey, 255))
                    .col(text(LlmConfig::BasePrompt))
                    .col(
                        double(LlmConfig::Temperature)
                            .default(0.7)
                            .check(Expr::col(LlmConfig::Temperature).gte(0.0))
                            .check(Expr::col(LlmConfig::Temperature).lte(2.0)),
                    )
                    .col(
                        integer(LlmConfig::MaxTokens)
                            .default(1000)
                            .check(Expr::col(LlmConfig::MaxTokens).gt(0)),
                    )
                    .col(boolean(LlmConfig::IsDefault).default(false))
                    .col(boolean(LlmConfig::IsActive).default(true))
                    .col(timestamp(LlmConfig::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(LlmConfig::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Homework::Table)
                    .if_not_exists()
                    .col(string_len(Homework::Id, 36).primary_key())
                    .col(string_len(Homework::TeacherId, 36))
                    .col(string_len_null(Homework::LlmConfigId, 36))
                    .col(string_len(Homework::Title, 200))
                    .col(text(Homework::Description))
                    .col(timestamp(Homework::DueDate))
                    .col(timestamp(Homework::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Homework::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-homeworks-teacher_id")
                            .from(Homework::Table, Homework::TeacherId)
                            .to(Teacher::Table, Teacher::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-homeworks-llm_config_id")
                            .from(Homework::Table, Homework::LlmConfigId)
                            .to(LlmConfig::Table, LlmConfig::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Section::Table)
                    .if_not_exists()
                    .col(string_len(Section::Id, 36).primary_key())
                    .col(string_len(Section::HomeworkId, 36))
                    .col(string_len(Section::Title, 200))
                    .col(text(Section::Content))
                    // SectionOrder bounds are represented in app code.
                    .col(
                        small_integer(Section::Order)
                            .check(Expr::col(Section::Order).gte(1))
                            .check(Expr::col(Section::Order).lte(20)),
                    )
                    .col(timestamp(Section::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Section::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sections-homework_id")
                            .from(Section::Table, Section::HomeworkId)
                            .to(Homework::Table, Homework::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sections_homework_id_order")
                    .table(Section::Table)
                    .col(Section::HomeworkId)
                    .col(Section::Order)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SectionSolution::Table)
                    .if_not_exists()
                    .col(string_len(SectionSolution::Id, 36).primary_key())
                    .col(string_len(SectionSolution::SectionId, 36).unique_key())
                    .col(text(SectionSolution::Content))
                    .col(timestamp(SectionSolution::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(SectionSolution::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-section_solutions-section_id")
                            .from(SectionSolution::Table, SectionSolution::SectionId)
                            .to(Section::Table, Section::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .if_not_exists()
                    .col(string_len(Conversation::Id, 36).primary_key())
                    .col(string_len(Conversation::UserId, 36))
                    .col(string_len(Conversation::SectionId, 36))
                    // ConversationRole enum is represented in app code.
                    // 0=student, 1=teacher_test
                    .col(
                        small_integer(Conversation::Role)
                            .check(Expr::col(Conversation::Role).gte(0))
                            .check(Expr::col(Conversation::Role).lte(1)),
                    )
                    .col(boolean(Conversation::IsDeleted).default(false))
                    .col(timestamp_null(Conversation::DeletedAt))
                    .col(timestamp(Conversation::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Conversation::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-conversations-user_id")
                            .from(Conversation::Table, Conversation::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-conversations-section_id")
                            .from(Conversation::Table, Conversation::SectionId)
                            .to(Section::Table, Section::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_conversations_user_id")
                    .table(Conversation::Table)
                    .col(Conversation::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_conversations_section_id_user_id")
                    .table(Conversation::Table)
                    .col(Conversation::SectionId)
                    .col(Conversation::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(string_len(Message::Id, 36).primary_key())
                    .col(string_len(Message::ConversationId, 36))
                    .col(text(Message::Content))
                    // MessageKind is represented in app code; unknown tags
                    // are preserved, so this stays an open string column.
                    .col(string_len(Message::Kind, 50))
                    .col(timestamp(Message::Timestamp).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-messages-conversation_id")
                            .from(Message::Table, Message::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_conversation_id_timestamp")
                    .table(Message::Table)
                    .col(Message::ConversationId)
                    .col(Message::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Submission::Table)
                    .if_not_exists()
                    .col(string_len(Submission::Id, 36).primary_key())
                    .col(string_len(Submission::ConversationId, 36).unique_key())
                    .col(timestamp(Submission::SubmittedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-submissions-conversation_id")
                            .from(Submission::Table, Submission::ConversationId)
                            .to(Conversation::Table, Conversation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submissions_submitted_at")
                    .table(Submission::Table)
                    .col(Submission::SubmittedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Submission::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Message::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Conversation::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SectionSolution::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Section::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Homework::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LlmConfig::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Student::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Teacher::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    Email,
    FirstName,
    LastName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Teacher {
    Table,
    Id,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Student {
    Table,
    Id,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LlmConfig {
    Table,
    Id,
    Name,
    ModelName,
    ApiKey,
    BasePrompt,
    Temperature,
    MaxTokens,
    IsDefault,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Homework {
    Table,
    Id,
    TeacherId,
    LlmConfigId,
    Title,
    Description,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Section {
    Table,
    Id,
    HomeworkId,
    Title,
    Content,
    Order,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SectionSolution {
    Table,
    Id,
    SectionId,
    Content,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Conversation {
    Table,
    Id,
    UserId,
    SectionId,
    Role,
    IsDeleted,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Message {
    Table,
    Id,
    ConversationId,
    Content,
    Kind,
    Timestamp,
}

#[derive(DeriveIden)]
enum Submission {
    Table,
    Id,
    ConversationId,
    SubmittedAt,
}
