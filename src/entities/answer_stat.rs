use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "answer_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub quiz_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub question_id: String,
    pub answer_count: i64,
    pub correct_count: i64,
    pub refreshed_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
