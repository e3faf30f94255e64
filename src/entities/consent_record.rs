//! Guardian consent for long-term retention of a student's data.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a consent record.
///
/// `Revoked` and `Expired` are terminal for the retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    #[sea_orm(string_value = "granted")]
    Granted,
    #[sea_orm(string_value = "revoked")]
    Revoked,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl ConsentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConsentStatus::Revoked | ConsentStatus::Expired)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consent_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub student_id: String,
    pub org_id: String,
    pub status: ConsentStatus,
    pub granted_at: i64,
    pub expires_at: i64,
    pub revoked_at: Option<i64>,
}

impl Model {
    /// Granted and not yet past its expiry at `now`.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.status == ConsentStatus::Granted && self.expires_at > now
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
