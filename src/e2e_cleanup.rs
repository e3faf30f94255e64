//! Removal of synthetic accounts left behind by end-to-end test runs.
//!
//! Accounts are recognised by a boolean marker in `users.metadata`. Their
//! dependent rows are removed in foreign-key order. The `users` row itself
//! stays: removing an auth identity needs privileges this job does not
//! hold, so those are cleaned up out of band.

use crate::entities;
use crate::errors::RetentionError;
use crate::settings::E2eCleanupSettings;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect,
};
use serde::Serialize;
use tracing::{error, info};

const SECS_PER_HOUR: i64 = 3_600;

/// Deletion order; each step only references rows removed by later steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Submissions,
    Participants,
    Sessions,
    Quizzes,
    Profiles,
    Entitlements,
}

const STEPS: [Step; 6] = [
    Step::Submissions,
    Step::Participants,
    Step::Sessions,
    Step::Quizzes,
    Step::Profiles,
    Step::Entitlements,
];

impl Step {
    fn name(self) -> &'static str {
        match self {
            Step::Submissions => "submissions",
            Step::Participants => "session_participants",
            Step::Sessions => "quiz_sessions",
            Step::Quizzes => "quizzes",
            Step::Profiles => "profiles",
            Step::Entitlements => "entitlements",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub submissions: u64,
    pub participants: u64,
    pub sessions: u64,
    pub quizzes: u64,
    pub profiles: u64,
    pub entitlements: u64,
}

impl TableCounts {
    fn add(&mut self, step: Step, count: u64) {
        match step {
            Step::Submissions => self.submissions += count,
            Step::Participants => self.participants += count,
            Step::Sessions => self.sessions += count,
            Step::Quizzes => self.quizzes += count,
            Step::Profiles => self.profiles += count,
            Step::Entitlements => self.entitlements += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.submissions
            + self.participants
            + self.sessions
            + self.quizzes
            + self.profiles
            + self.entitlements
    }
}

/// What was (or, in dry-run mode, would be) deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct E2eCleanupReport {
    pub cutoff: i64,
    /// Ids of the matched test accounts
    pub users: Vec<String>,
    pub deleted: TableCounts,
    pub failures: u64,
    pub dry_run: bool,
}

/// Rows reachable from one test account.
#[derive(Debug, Default)]
struct UserScope {
    user_id: String,
    quiz_ids: Vec<String>,
    session_ids: Vec<String>,
    participant_ids: Vec<String>,
}

pub async fn find_test_users(
    db: &DatabaseConnection,
    cfg: &E2eCleanupSettings,
    cutoff: i64,
) -> Result<Vec<entities::user::Model>, RetentionError> {
    use entities::user::{Column, Entity};

    let candidates = Entity::find()
        .filter(Column::CreatedAt.lt(cutoff))
        .filter(Column::Metadata.is_not_null())
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|u| u.has_marker(&cfg.marker_key))
        .collect())
}

/// Accounts created before this instant are old enough to clean up.
pub fn cutoff(now: i64, max_age_hours: i64) -> Result<i64, RetentionError> {
    if max_age_hours < 0 {
        return Err(RetentionError::BadRequest(format!(
            "max_age_hours must not be negative, got {}",
            max_age_hours
        )));
    }
    max_age_hours
        .checked_mul(SECS_PER_HOUR)
        .and_then(|age| now.checked_sub(age))
        .ok_or_else(|| {
            RetentionError::BadRequest(format!("max_age_hours out of range: {}", max_age_hours))
        })
}

pub async fn run_e2e_cleanup(
    db: &DatabaseConnection,
    cfg: &E2eCleanupSettings,
    now: i64,
) -> E2eCleanupReport {
    let mut report = E2eCleanupReport {
        dry_run: cfg.dry_run,
        ..Default::default()
    };

    report.cutoff = match cutoff(now, cfg.max_age_hours) {
        Ok(cutoff) => cutoff,
        Err(e) => {
            error!(max_age_hours = cfg.max_age_hours, error = %e, "Refusing to run E2E cleanup");
            report.failures += 1;
            return report;
        }
    };
    let cutoff = report.cutoff;

    info!(
        max_age_hours = cfg.max_age_hours,
        marker = %cfg.marker_key,
        dry_run = cfg.dry_run,
        "Starting E2E test data cleanup"
    );

    let users = match find_test_users(db, cfg, cutoff).await {
        Ok(users) => users,
        Err(e) => {
            error!(error = %e, "Failed to list test accounts");
            report.failures += 1;
            return report;
        }
    };

    for user in users {
        let scope = match resolve_scope(db, &user.id).await {
            Ok(scope) => scope,
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Failed to resolve test account data");
                report.failures += 1;
                continue;
            }
        };

        for step in STEPS {
            match run_step(db, step, &scope, cfg.dry_run).await {
                Ok(count) => report.deleted.add(step, count),
                Err(e) => {
                    error!(
                        user_id = %user.id,
                        step = step.name(),
                        error = %e,
                        "E2E cleanup step failed"
                    );
                    report.failures += 1;
                }
            }
        }

        report.users.push(user.id);
    }

    info!(
        users = report.users.len(),
        submissions = report.deleted.submissions,
        participants = report.deleted.participants,
        sessions = report.deleted.sessions,
        quizzes = report.deleted.quizzes,
        profiles = report.deleted.profiles,
        entitlements = report.deleted.entitlements,
        failures = report.failures,
        dry_run = cfg.dry_run,
        "{}",
        if cfg.dry_run {
            "E2E cleanup dry run: nothing deleted"
        } else {
            "E2E cleanup complete"
        }
    );

    report
}

async fn resolve_scope(db: &DatabaseConnection, user_id: &str) -> Result<UserScope, RetentionError> {
    use entities::{quiz, quiz_session, session_participant};

    let quiz_ids: Vec<String> = quiz::Entity::find()
        .select_only()
        .column(quiz::Column::Id)
        .filter(quiz::Column::OwnerId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;

    let session_ids: Vec<String> = quiz_session::Entity::find()
        .select_only()
        .column(quiz_session::Column::Id)
        .filter(
            Condition::any()
                .add(quiz_session::Column::HostId.eq(user_id))
                .add(quiz_session::Column::QuizId.is_in(quiz_ids.clone())),
        )
        .into_tuple()
        .all(db)
        .await?;

    let participant_ids: Vec<String> = session_participant::Entity::find()
        .select_only()
        .column(session_participant::Column::Id)
        .filter(
            Condition::any()
                .add(session_participant::Column::UserId.eq(user_id))
                .add(session_participant::Column::SessionId.is_in(session_ids.clone())),
        )
        .into_tuple()
        .all(db)
        .await?;

    Ok(UserScope {
        user_id: user_id.to_string(),
        quiz_ids,
        session_ids,
        participant_ids,
    })
}

async fn run_step(
    db: &DatabaseConnection,
    step: Step,
    scope: &UserScope,
    dry_run: bool,
) -> Result<u64, RetentionError> {
    use entities::{entitlement, profile, quiz, quiz_session, session_participant, submission};

    let count = match step {
        Step::Submissions => {
            let condition = Condition::any()
                .add(submission::Column::ParticipantId.is_in(scope.participant_ids.clone()))
                .add(submission::Column::SessionId.is_in(scope.session_ids.clone()));
            if dry_run {
                submission::Entity::find().filter(condition).count(db).await?
            } else {
                submission::Entity::delete_many()
                    .filter(condition)
                    .exec(db)
                    .await?
                    .rows_affected
            }
        }
        Step::Participants => {
            let condition =
                session_participant::Column::Id.is_in(scope.participant_ids.clone());
            if dry_run {
                session_participant::Entity::find()
                    .filter(condition)
                    .count(db)
                    .await?
            } else {
                session_participant::Entity::delete_many()
                    .filter(condition)
                    .exec(db)
                    .await?
                    .rows_affected
            }
        }
        Step::Sessions => {
            let condition = quiz_session::Column::Id.is_in(scope.session_ids.clone());
            if dry_run {
                quiz_session::Entity::find().filter(condition).count(db).await?
            } else {
                quiz_session::Entity::delete_many()
                    .filter(condition)
                    .exec(db)
                    .await?
                    .rows_affected
            }
        }
        Step::Quizzes => {
            // Attempts and answers on these quizzes go with them (cascade)
            let condition = quiz::Column::Id.is_in(scope.quiz_ids.clone());
            if dry_run {
                quiz::Entity::find().filter(condition).count(db).await?
            } else {
                quiz::Entity::delete_many()
                    .filter(condition)
                    .exec(db)
                    .await?
                    .rows_affected
            }
        }
        Step::Profiles => {
            let condition = profile::Column::UserId.eq(scope.user_id.as_str());
            if dry_run {
                profile::Entity::find().filter(condition).count(db).await?
            } else {
                profile::Entity::delete_many()
                    .filter(condition)
                    .exec(db)
                    .await?
                    .rows_affected
            }
        }
        Step::Entitlements => {
            let condition = entitlement::Column::UserId.eq(scope.user_id.as_str());
            if dry_run {
                entitlement::Entity::find().filter(condition).count(db).await?
            } else {
                entitlement::Entity::delete_many()
                    .filter(condition)
                    .exec(db)
                    .await?
                    .rows_affected
            }
        }
    };

    Ok(count)
}
