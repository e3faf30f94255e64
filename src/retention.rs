//! Retention sweep: the periodic pass that enforces consent expiry and
//! data retention windows.
//!
//! Every predicate is an absolute timestamp comparison against `now`, so a
//! second run right after the first changes nothing and overlapping runs
//! converge on the same end state. Each step, and each organization or
//! consent inside a step, is isolated: a failure is logged with its ids,
//! counted in [`SweepReport::failures`] and the sweep moves on.

use crate::entities;
use crate::entities::attempt::DataMode;
use crate::entities::consent_record::ConsentStatus;
use crate::errors::RetentionError;
use crate::policy;
use crate::settings::{PurgeScope, RetentionSettings};
use crate::storage;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub total_consents: u64,
    pub active_consents: u64,
    pub short_attempts: u64,
    pub long_attempts: u64,
}

/// Outcome of one sweep. In dry-run mode the counts are what would have
/// been changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub consents_expired: u64,
    pub invites_expired: u64,
    pub short_attempts_purged: u64,
    pub long_attempts_purged: u64,
    /// Item-level errors that were logged and skipped
    pub failures: u64,
    pub stats: Option<SweepStats>,
    pub dry_run: bool,
}

impl SweepReport {
    pub fn records_processed(&self) -> u64 {
        self.consents_expired
            + self.invites_expired
            + self.short_attempts_purged
            + self.long_attempts_purged
    }
}

pub async fn run_retention_sweep(
    db: &DatabaseConnection,
    cfg: &RetentionSettings,
    now: i64,
) -> SweepReport {
    let mut report = SweepReport {
        dry_run: cfg.dry_run,
        ..Default::default()
    };

    info!(now, dry_run = cfg.dry_run, scope = ?cfg.purge_scope, "Starting retention sweep");

    let newly_expired = expire_consents(db, cfg, now, &mut report).await;
    expire_invites(db, cfg, now, &mut report).await;
    purge_short_term_attempts(db, cfg, now, &mut report).await;
    purge_withdrawn_consent_data(db, cfg, now, &newly_expired, &mut report).await;

    report.stats = match collect_stats(db, now).await {
        Ok(stats) => {
            info!(
                total_consents = stats.total_consents,
                active_consents = stats.active_consents,
                short_attempts = stats.short_attempts,
                long_attempts = stats.long_attempts,
                "Retention statistics"
            );
            Some(stats)
        }
        Err(e) => {
            warn!(error = %e, "Failed to collect retention statistics");
            None
        }
    };

    info!(
        consents_expired = report.consents_expired,
        invites_expired = report.invites_expired,
        short_attempts_purged = report.short_attempts_purged,
        long_attempts_purged = report.long_attempts_purged,
        failures = report.failures,
        dry_run = report.dry_run,
        "Retention sweep complete"
    );

    report
}

/// Step 1: granted consents past `expires_at` become `expired`.
///
/// Returns the affected rows with their new status. In dry-run mode they
/// are still `granted` in the database.
async fn expire_consents(
    db: &DatabaseConnection,
    cfg: &RetentionSettings,
    now: i64,
    report: &mut SweepReport,
) -> Vec<entities::consent_record::Model> {
    let result = if cfg.dry_run {
        storage::find_due_consents(db, now).await
    } else {
        storage::expire_due_consents(db, now).await
    };

    match result {
        Ok(consents) => {
            for c in &consents {
                info!(
                    consent_id = %c.id,
                    student_id = %c.student_id,
                    org_id = %c.org_id,
                    dry_run = cfg.dry_run,
                    "Consent expired"
                );
            }
            report.consents_expired = consents.len() as u64;
            consents
                .into_iter()
                .map(|mut c| {
                    c.status = ConsentStatus::Expired;
                    c
                })
                .collect()
        }
        Err(e) => {
            error!(step = "expire_consents", error = %e, "Failed to expire consents");
            report.failures += 1;
            Vec::new()
        }
    }
}

/// Step 2: open invites past `expires_at` become `expired`.
async fn expire_invites(
    db: &DatabaseConnection,
    cfg: &RetentionSettings,
    now: i64,
    report: &mut SweepReport,
) {
    let result = if cfg.dry_run {
        storage::count_due_invites(db, now).await
    } else {
        storage::expire_due_invites(db, now).await
    };

    match result {
        Ok(count) => {
            debug!(count, "Expired consent invites");
            report.invites_expired = count;
        }
        Err(e) => {
            error!(step = "expire_invites", error = %e, "Failed to expire invites");
            report.failures += 1;
        }
    }
}

/// Step 3: short-mode attempts older than each organization's window.
async fn purge_short_term_attempts(
    db: &DatabaseConnection,
    cfg: &RetentionSettings,
    now: i64,
    report: &mut SweepReport,
) {
    let orgs = match storage::list_organizations(db).await {
        Ok(orgs) => orgs,
        Err(e) => {
            error!(step = "purge_short_term", error = %e, "Failed to list organizations");
            report.failures += 1;
            return;
        }
    };

    for org in orgs {
        match purge_short_term_for_org(db, &org.id, cfg, now).await {
            Ok(count) => {
                if count > 0 {
                    info!(org_id = %org.id, count, dry_run = cfg.dry_run, "Purged short-term attempts");
                }
                report.short_attempts_purged += count;
            }
            Err(e) => {
                error!(
                    step = "purge_short_term",
                    org_id = %org.id,
                    error = %e,
                    "Short-term purge failed for organization"
                );
                report.failures += 1;
            }
        }
    }
}

async fn purge_short_term_for_org(
    db: &DatabaseConnection,
    org_id: &str,
    cfg: &RetentionSettings,
    now: i64,
) -> Result<u64, RetentionError> {
    use entities::attempt::Column;

    let policy = policy::get_policy(db, org_id, cfg).await?;
    let cutoff = policy.short_term_cutoff(now);

    let condition = Condition::all()
        .add(Column::OrgId.eq(org_id))
        .add(Column::DataMode.eq(DataMode::Short))
        .add(Column::CreatedAt.lt(cutoff));

    delete_or_count(db, condition, cfg.dry_run).await
}

/// Step 4: long-mode attempts of students whose consent was revoked or
/// has expired. Answers follow through the cascade.
///
/// `newly_expired` are the rows step 1 expired. A dry run did not write
/// them, so they are added here to count what a real run would purge.
async fn purge_withdrawn_consent_data(
    db: &DatabaseConnection,
    cfg: &RetentionSettings,
    now: i64,
    newly_expired: &[entities::consent_record::Model],
    report: &mut SweepReport,
) {
    let mut consents = match storage::terminal_consents(db).await {
        Ok(consents) => consents,
        Err(e) => {
            error!(step = "purge_withdrawn_consent", error = %e, "Failed to load revoked/expired consents");
            report.failures += 1;
            return;
        }
    };
    if cfg.dry_run {
        consents.extend(newly_expired.iter().cloned());
    }

    // Purge targets already handled in this pass; later consents with the
    // same target would find nothing left to delete
    let mut purged: HashSet<(String, Option<String>)> = HashSet::new();

    for consent in consents {
        let target = purge_target(&consent, cfg.purge_scope);
        if purged.contains(&target) {
            continue;
        }

        match purge_for_consent(db, &consent, cfg, now).await {
            Ok(None) => {}
            Ok(Some(count)) => {
                purged.insert(target);
                if count > 0 {
                    info!(
                        consent_id = %consent.id,
                        student_id = %consent.student_id,
                        org_id = %consent.org_id,
                        count,
                        dry_run = cfg.dry_run,
                        "Purged long-term attempts"
                    );
                }
                report.long_attempts_purged += count;
            }
            Err(e) => {
                error!(
                    step = "purge_withdrawn_consent",
                    consent_id = %consent.id,
                    student_id = %consent.student_id,
                    org_id = %consent.org_id,
                    error = %e,
                    "Long-term purge failed for consent"
                );
                report.failures += 1;
            }
        }
    }
}

fn purge_target(
    consent: &entities::consent_record::Model,
    scope: PurgeScope,
) -> (String, Option<String>) {
    match scope {
        PurgeScope::Organization => (consent.student_id.clone(), Some(consent.org_id.clone())),
        PurgeScope::Student => (consent.student_id.clone(), None),
    }
}

/// `None` when a newer active consent supersedes this one.
async fn purge_for_consent(
    db: &DatabaseConnection,
    consent: &entities::consent_record::Model,
    cfg: &RetentionSettings,
    now: i64,
) -> Result<Option<u64>, RetentionError> {
    use entities::attempt::Column;

    // A newer grant in the same organization is authoritative
    if storage::find_active_consent(db, &consent.student_id, &consent.org_id, now)
        .await?
        .is_some()
    {
        debug!(consent_id = %consent.id, "Superseded by an active consent, skipping");
        return Ok(None);
    }

    let mut condition = Condition::all()
        .add(Column::StudentId.eq(consent.student_id.as_str()))
        .add(Column::DataMode.eq(DataMode::Long));
    if cfg.purge_scope == PurgeScope::Organization {
        condition = condition.add(Column::OrgId.eq(consent.org_id.as_str()));
    }

    delete_or_count(db, condition, cfg.dry_run).await.map(Some)
}

async fn delete_or_count(
    db: &DatabaseConnection,
    condition: Condition,
    dry_run: bool,
) -> Result<u64, RetentionError> {
    use entities::attempt::Entity;

    if dry_run {
        return Ok(Entity::find().filter(condition).count(db).await?);
    }

    let result = Entity::delete_many().filter(condition).exec(db).await?;
    Ok(result.rows_affected)
}

/// Step 5: observability counts.
async fn collect_stats(db: &DatabaseConnection, now: i64) -> Result<SweepStats, RetentionError> {
    use entities::consent_record::{Column, Entity};

    let total_consents = Entity::find().count(db).await?;
    let active_consents = Entity::find()
        .filter(Column::Status.eq(ConsentStatus::Granted))
        .filter(Column::ExpiresAt.gt(now))
        .count(db)
        .await?;

    Ok(SweepStats {
        total_consents,
        active_consents,
        short_attempts: storage::count_attempts_by_mode(db, DataMode::Short).await?,
        long_attempts: storage::count_attempts_by_mode(db, DataMode::Long).await?,
    })
}
