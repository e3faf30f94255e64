use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "visited")]
    Visited,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl InviteStatus {
    /// Still waiting on the guardian.
    pub fn is_open(self) -> bool {
        matches!(self, InviteStatus::Sent | InviteStatus::Visited)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consent_invites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub student_id: String,
    pub org_id: String,
    pub guardian_email: String,
    pub status: InviteStatus,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
