use crate::entities;
use crate::entities::attempt::DataMode;
use crate::entities::consent_invite::InviteStatus;
use crate::entities::consent_record::ConsentStatus;
use crate::errors::RetentionError;
use crate::settings::Database as DbCfg;
use chrono::{DateTime, Days, Months, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, Iterable,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, RetentionError> {
    let db = Database::connect(&cfg.url).await?;
    Ok(db)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn to_datetime(ts: i64) -> Result<DateTime<Utc>, RetentionError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| RetentionError::BadRequest(format!("timestamp out of range: {}", ts)))
}

/// `now` plus whole calendar months, clamped to the end of shorter months.
pub fn add_months(now: i64, months: u32) -> Result<i64, RetentionError> {
    to_datetime(now)?
        .checked_add_months(Months::new(months))
        .map(|t| t.timestamp())
        .ok_or_else(|| RetentionError::BadRequest(format!("cannot add {} months", months)))
}

pub fn add_days(now: i64, days: u64) -> Result<i64, RetentionError> {
    to_datetime(now)?
        .checked_add_days(Days::new(days))
        .map(|t| t.timestamp())
        .ok_or_else(|| RetentionError::BadRequest(format!("cannot add {} days", days)))
}

// ============================================================================
// Organizations
// ============================================================================

pub async fn create_organization(
    db: &DatabaseConnection,
    name: &str,
    now: i64,
) -> Result<entities::organization::Model, RetentionError> {
    let org = entities::organization::ActiveModel {
        id: Set(new_id()),
        name: Set(name.to_string()),
        created_at: Set(now),
    };

    Ok(org.insert(db).await?)
}

pub async fn list_organizations(
    db: &DatabaseConnection,
) -> Result<Vec<entities::organization::Model>, RetentionError> {
    use entities::organization::{Column, Entity};

    Ok(Entity::find()
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

// ============================================================================
// Consent Records
// ============================================================================

/// Record a guardian's consent, valid for `valid_months` calendar months.
pub async fn grant_consent(
    db: &DatabaseConnection,
    student_id: &str,
    org_id: &str,
    valid_months: u32,
    now: i64,
) -> Result<entities::consent_record::Model, RetentionError> {
    let consent = entities::consent_record::ActiveModel {
        id: Set(new_id()),
        student_id: Set(student_id.to_string()),
        org_id: Set(org_id.to_string()),
        status: Set(ConsentStatus::Granted),
        granted_at: Set(now),
        expires_at: Set(add_months(now, valid_months)?),
        revoked_at: Set(None),
    };

    Ok(consent.insert(db).await?)
}

/// Revoke a granted consent. Returns false when the record is missing or
/// already terminal.
pub async fn revoke_consent(
    db: &DatabaseConnection,
    consent_id: &str,
    now: i64,
) -> Result<bool, RetentionError> {
    use entities::consent_record::{Column, Entity};

    if let Some(consent) = Entity::find()
        .filter(Column::Id.eq(consent_id))
        .filter(Column::Status.eq(ConsentStatus::Granted))
        .one(db)
        .await?
    {
        let mut active: entities::consent_record::ActiveModel = consent.into();
        active.status = Set(ConsentStatus::Revoked);
        active.revoked_at = Set(Some(now));
        active.update(db).await?;
        return Ok(true);
    }

    Ok(false)
}

/// The authoritative consent for a student in an organization: the most
/// recently granted record that is still `granted` and unexpired at `now`.
pub async fn find_active_consent(
    db: &DatabaseConnection,
    student_id: &str,
    org_id: &str,
    now: i64,
) -> Result<Option<entities::consent_record::Model>, RetentionError> {
    use entities::consent_record::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::StudentId.eq(student_id))
        .filter(Column::OrgId.eq(org_id))
        .filter(Column::Status.eq(ConsentStatus::Granted))
        .filter(Column::ExpiresAt.gt(now))
        .order_by_desc(Column::GrantedAt)
        .one(db)
        .await?)
}

pub async fn get_consents_by_student(
    db: &DatabaseConnection,
    student_id: &str,
) -> Result<Vec<entities::consent_record::Model>, RetentionError> {
    use entities::consent_record::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::StudentId.eq(student_id))
        .order_by_desc(Column::GrantedAt)
        .all(db)
        .await?)
}

/// Granted consents whose expiry has passed.
pub async fn find_due_consents(
    db: &DatabaseConnection,
    now: i64,
) -> Result<Vec<entities::consent_record::Model>, RetentionError> {
    use entities::consent_record::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::Status.eq(ConsentStatus::Granted))
        .filter(Column::ExpiresAt.lt(now))
        .all(db)
        .await?)
}

/// Move every granted consent with `expires_at < now` to `expired`.
/// Returns the rows as they are after the update.
pub async fn expire_due_consents(
    db: &DatabaseConnection,
    now: i64,
) -> Result<Vec<entities::consent_record::Model>, RetentionError> {
    use entities::consent_record::{ActiveModel, Column, Entity};

    let due = find_due_consents(db, now).await?;
    if due.is_empty() {
        return Ok(due);
    }

    let ids: Vec<String> = due.iter().map(|c| c.id.clone()).collect();
    Entity::update_many()
        .set(ActiveModel {
            status: Set(ConsentStatus::Expired),
            ..Default::default()
        })
        .filter(Column::Id.is_in(ids))
        .filter(Column::Status.eq(ConsentStatus::Granted))
        .exec(db)
        .await?;

    Ok(due
        .into_iter()
        .map(|mut c| {
            c.status = ConsentStatus::Expired;
            c
        })
        .collect())
}

/// Revoked or expired consents, oldest first.
pub async fn terminal_consents(
    db: &DatabaseConnection,
) -> Result<Vec<entities::consent_record::Model>, RetentionError> {
    use entities::consent_record::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::Status.is_in(ConsentStatus::iter().filter(|s| s.is_terminal())))
        .order_by_asc(Column::GrantedAt)
        .all(db)
        .await?)
}

// ============================================================================
// Consent Invites
// ============================================================================

pub async fn create_invite(
    db: &DatabaseConnection,
    student_id: &str,
    org_id: &str,
    guardian_email: &str,
    ttl_days: u64,
    now: i64,
) -> Result<entities::consent_invite::Model, RetentionError> {
    let invite = entities::consent_invite::ActiveModel {
        id: Set(new_id()),
        student_id: Set(student_id.to_string()),
        org_id: Set(org_id.to_string()),
        guardian_email: Set(guardian_email.to_string()),
        status: Set(InviteStatus::Sent),
        created_at: Set(now),
        expires_at: Set(add_days(now, ttl_days)?),
    };

    Ok(invite.insert(db).await?)
}

async fn transition_invite(
    db: &DatabaseConnection,
    invite_id: &str,
    to: InviteStatus,
) -> Result<bool, RetentionError> {
    use entities::consent_invite::{Column, Entity};

    if let Some(invite) = Entity::find()
        .filter(Column::Id.eq(invite_id))
        .one(db)
        .await?
    {
        if !invite.status.is_open() {
            return Ok(false);
        }
        let mut active: entities::consent_invite::ActiveModel = invite.into();
        active.status = Set(to);
        active.update(db).await?;
        return Ok(true);
    }

    Ok(false)
}

/// Guardian opened the invite link.
pub async fn mark_invite_visited(
    db: &DatabaseConnection,
    invite_id: &str,
) -> Result<bool, RetentionError> {
    transition_invite(db, invite_id, InviteStatus::Visited).await
}

/// Guardian finished the consent flow.
pub async fn complete_invite(
    db: &DatabaseConnection,
    invite_id: &str,
) -> Result<bool, RetentionError> {
    transition_invite(db, invite_id, InviteStatus::Completed).await
}

pub async fn count_due_invites(db: &DatabaseConnection, now: i64) -> Result<u64, RetentionError> {
    use entities::consent_invite::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::Status.is_in([InviteStatus::Sent, InviteStatus::Visited]))
        .filter(Column::ExpiresAt.lt(now))
        .count(db)
        .await?)
}

/// Open invites (`sent`/`visited`) past their expiry become `expired`.
pub async fn expire_due_invites(db: &DatabaseConnection, now: i64) -> Result<u64, RetentionError> {
    use entities::consent_invite::{ActiveModel, Column, Entity};

    let result = Entity::update_many()
        .set(ActiveModel {
            status: Set(InviteStatus::Expired),
            ..Default::default()
        })
        .filter(Column::Status.is_in([InviteStatus::Sent, InviteStatus::Visited]))
        .filter(Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

// ============================================================================
// Quizzes and Attempts
// ============================================================================

pub async fn get_quiz(
    db: &DatabaseConnection,
    quiz_id: &str,
) -> Result<Option<entities::quiz::Model>, RetentionError> {
    use entities::quiz::Entity;

    Ok(Entity::find_by_id(quiz_id.to_string()).one(db).await?)
}

pub async fn insert_attempt(
    db: &DatabaseConnection,
    quiz_id: &str,
    org_id: &str,
    student_id: Option<String>,
    data_mode: DataMode,
    now: i64,
) -> Result<entities::attempt::Model, RetentionError> {
    let attempt = entities::attempt::ActiveModel {
        id: Set(new_id()),
        quiz_id: Set(quiz_id.to_string()),
        org_id: Set(org_id.to_string()),
        student_id: Set(student_id),
        data_mode: Set(data_mode),
        created_at: Set(now),
    };

    Ok(attempt.insert(db).await?)
}

pub async fn get_attempt(
    db: &DatabaseConnection,
    attempt_id: &str,
) -> Result<Option<entities::attempt::Model>, RetentionError> {
    use entities::attempt::Entity;

    Ok(Entity::find_by_id(attempt_id.to_string()).one(db).await?)
}

pub async fn count_attempts_by_mode(
    db: &DatabaseConnection,
    mode: DataMode,
) -> Result<u64, RetentionError> {
    use entities::attempt::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::DataMode.eq(mode))
        .count(db)
        .await?)
}
