//! Per-organization retention policy.
//!
//! An organization without a settings row, or with NULL columns, runs on the
//! configured defaults. Stored values outside the accepted ranges are treated
//! as malformed rather than clamped, so the sweep skips that organization
//! instead of purging on a guess.

use crate::entities;
use crate::entities::org_retention_settings::Model as SettingsRow;
use crate::errors::RetentionError;
use crate::settings::RetentionSettings;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};

pub const MAX_KORTTID_DAYS: i64 = 3650;
pub const MAX_CONSENT_VALID_MONTHS: u32 = 120;
const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Short-term ("korttid") window in days
    pub retention_korttid_days: i64,
    pub consent_valid_months: u32,
    pub require_guardian_consent: bool,
}

impl RetentionPolicy {
    pub fn defaults(cfg: &RetentionSettings) -> Self {
        Self {
            retention_korttid_days: cfg.default_korttid_days,
            consent_valid_months: cfg.default_consent_valid_months,
            require_guardian_consent: true,
        }
    }

    /// Short-term attempts created strictly before this instant are purged.
    pub fn short_term_cutoff(&self, now: i64) -> i64 {
        now - self.retention_korttid_days * SECS_PER_DAY
    }

    /// Combine a stored settings row with the defaults, validating ranges.
    pub fn resolve(
        org_id: &str,
        row: Option<&SettingsRow>,
        defaults: &RetentionSettings,
    ) -> Result<Self, RetentionError> {
        let mut policy = Self::defaults(defaults);

        if let Some(row) = row {
            if let Some(days) = row.retention_korttid_days {
                policy.retention_korttid_days = i64::from(days);
            }
            if let Some(months) = row.consent_valid_months {
                policy.consent_valid_months = u32::try_from(months).map_err(|_| {
                    invalid(org_id, format!("consent_valid_months = {}", months))
                })?;
            }
            policy.require_guardian_consent = row.require_guardian_consent;
        }

        policy.validate(org_id)?;
        Ok(policy)
    }

    fn validate(&self, org_id: &str) -> Result<(), RetentionError> {
        if !(1..=MAX_KORTTID_DAYS).contains(&self.retention_korttid_days) {
            return Err(invalid(
                org_id,
                format!(
                    "retention_korttid_days = {} (expected 1..={})",
                    self.retention_korttid_days, MAX_KORTTID_DAYS
                ),
            ));
        }
        if !(1..=MAX_CONSENT_VALID_MONTHS).contains(&self.consent_valid_months) {
            return Err(invalid(
                org_id,
                format!(
                    "consent_valid_months = {} (expected 1..={})",
                    self.consent_valid_months, MAX_CONSENT_VALID_MONTHS
                ),
            ));
        }
        Ok(())
    }
}

fn invalid(org_id: &str, reason: String) -> RetentionError {
    RetentionError::InvalidPolicy {
        org_id: org_id.to_string(),
        reason,
    }
}

/// Admin-side update of an organization's settings. `None` resets a value
/// to the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyUpdate {
    pub retention_korttid_days: Option<i32>,
    pub consent_valid_months: Option<i32>,
    pub require_guardian_consent: bool,
}

pub async fn get_policy(
    db: &DatabaseConnection,
    org_id: &str,
    defaults: &RetentionSettings,
) -> Result<RetentionPolicy, RetentionError> {
    use entities::org_retention_settings::Entity;

    let row = Entity::find_by_id(org_id.to_string()).one(db).await?;
    RetentionPolicy::resolve(org_id, row.as_ref(), defaults)
}

pub async fn set_policy(
    db: &DatabaseConnection,
    org_id: &str,
    update: PolicyUpdate,
    defaults: &RetentionSettings,
) -> Result<RetentionPolicy, RetentionError> {
    use entities::org_retention_settings::{ActiveModel, Column, Entity};

    let now = Utc::now().timestamp();
    let row = SettingsRow {
        org_id: org_id.to_string(),
        retention_korttid_days: update.retention_korttid_days,
        consent_valid_months: update.consent_valid_months,
        require_guardian_consent: update.require_guardian_consent,
        updated_at: now,
    };
    // Refuse to persist something the sweep would reject later
    let policy = RetentionPolicy::resolve(org_id, Some(&row), defaults)?;

    let active = ActiveModel {
        org_id: Set(row.org_id),
        retention_korttid_days: Set(row.retention_korttid_days),
        consent_valid_months: Set(row.consent_valid_months),
        require_guardian_consent: Set(row.require_guardian_consent),
        updated_at: Set(row.updated_at),
    };

    Entity::insert(active)
        .on_conflict(
            OnConflict::column(Column::OrgId)
                .update_columns([
                    Column::RetentionKorttidDays,
                    Column::ConsentValidMonths,
                    Column::RequireGuardianConsent,
                    Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

    Ok(policy)
}
