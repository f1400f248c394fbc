use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "section")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub homework_id: String,
    pub title: String,
    pub content: String,
    pub order: i16,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::homework::Entity",
        from = "Column::HomeworkId",
        to = "super::homework::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Homework,
    #[sea_orm(has_one = "super::section_solution::Entity")]
    SectionSolution,
    #[sea_orm(has_many = "super::conversation::Entity")]
    Conversation,
}

impl Related<super::homework::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Homework.def()
    }
}

impl Related<super::section_solution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SectionSolution.def()
    }
}

impl Related<super::conversation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
