use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub email: String,
    pub metadata: Option<String>, // JSON object, e.g. {"e2e_test": true}
    pub created_at: i64,
}

impl Model {
    /// True when the metadata JSON carries `marker_key: true`.
    pub fn has_marker(&self, marker_key: &str) -> bool {
        self.metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|meta| meta.get(marker_key).and_then(|v| v.as_bool()))
            .unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
