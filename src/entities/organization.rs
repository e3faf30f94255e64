use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::org_retention_settings::Entity")]
    RetentionSettings,
}

impl Related<super::org_retention_settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RetentionSettings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
