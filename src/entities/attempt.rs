//! A student's run through a quiz.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Retention class of an attempt, fixed when the attempt is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// Purged once older than the organization's short-term window.
    #[sea_orm(string_value = "short")]
    Short,
    /// Kept while the guardian consent it was created under stays valid.
    #[sea_orm(string_value = "long")]
    Long,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attempts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub quiz_id: String,
    pub org_id: String, // copied from the quiz at creation
    pub student_id: Option<String>,
    pub data_mode: DataMode,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quiz::Entity",
        from = "Column::QuizId",
        to = "super::quiz::Column::Id",
        on_delete = "Cascade"
    )]
    Quiz,
    #[sea_orm(has_many = "super::answer::Entity")]
    Answer,
}

impl Related<super::quiz::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quiz.def()
    }
}

impl Related<super::answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
