//! Retention class decision made when a student starts an attempt.

use crate::entities;
use crate::entities::attempt::DataMode;
use crate::errors::RetentionError;
use crate::policy;
use crate::settings::RetentionSettings;
use crate::storage;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Decide whether a new attempt may be kept long-term.
///
/// Any failure along the way resolves to [`DataMode::Short`]; attempt
/// creation is never blocked by a consent lookup.
pub async fn resolve_data_mode(
    db: &DatabaseConnection,
    student_id: Option<&str>,
    org_id: &str,
    defaults: &RetentionSettings,
    now: i64,
) -> DataMode {
    // Anonymous and guest participation is never retained long-term
    let Some(student_id) = student_id else {
        return DataMode::Short;
    };

    let policy = match policy::get_policy(db, org_id, defaults).await {
        Ok(p) => p,
        Err(e) => {
            warn!(org_id, student_id, error = %e, "Retention policy lookup failed, using short mode");
            return DataMode::Short;
        }
    };
    if !policy.require_guardian_consent {
        return DataMode::Short;
    }

    match storage::find_active_consent(db, student_id, org_id, now).await {
        Ok(Some(_)) => DataMode::Long,
        Ok(None) => DataMode::Short,
        Err(e) => {
            warn!(org_id, student_id, error = %e, "Consent lookup failed, using short mode");
            DataMode::Short
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttempt {
    pub quiz_id: String,
    pub student_id: Option<String>,
}

/// Create an attempt with its data mode fixed at this instant.
pub async fn create_attempt(
    db: &DatabaseConnection,
    input: NewAttempt,
    defaults: &RetentionSettings,
    now: i64,
) -> Result<entities::attempt::Model, RetentionError> {
    let quiz = storage::get_quiz(db, &input.quiz_id)
        .await?
        .ok_or_else(|| RetentionError::BadRequest(format!("unknown quiz {}", input.quiz_id)))?;
    let org_id = quiz.org_id.ok_or_else(|| {
        RetentionError::BadRequest(format!("quiz {} has no organization", input.quiz_id))
    })?;

    let data_mode =
        resolve_data_mode(db, input.student_id.as_deref(), &org_id, defaults, now).await;

    storage::insert_attempt(db, &quiz.id, &org_id, input.student_id, data_mode, now).await
}
