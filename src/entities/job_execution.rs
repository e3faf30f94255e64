use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One run of a maintenance job, scheduled or triggered by hand.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job_executions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,
    pub job_name: String,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub success: Option<i64>, // 0 = aborted, 1 = reached the end, NULL = running
    pub error_message: Option<String>, // item failures are summarised here too
    pub records_processed: Option<i64>,
}

impl Model {
    pub fn is_running(&self) -> bool {
        self.completed_at.is_none()
    }

    pub fn succeeded(&self) -> bool {
        self.success == Some(1)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
