use crate::answer_stats;
use crate::e2e_cleanup;
use crate::entities;
use crate::errors::RetentionError;
use crate::rate_limit;
use crate::retention;
use crate::settings::Settings;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

pub const RETENTION_SWEEP: &str = "retention_sweep";
pub const E2E_CLEANUP: &str = "e2e_cleanup";
pub const REFRESH_ANSWER_STATS: &str = "refresh_answer_stats";
pub const CLEANUP_RATE_LIMIT_WINDOWS: &str = "cleanup_rate_limit_windows";

/// Result of one job run that reached the end of its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobOutcome {
    pub records_processed: u64,
    pub failures: u64,
}

/// Initialize and start the job scheduler with all maintenance jobs
pub async fn init_scheduler(
    db: DatabaseConnection,
    settings: Settings,
) -> Result<JobScheduler, RetentionError> {
    let sched = JobScheduler::new()
        .await
        .map_err(|e| RetentionError::Other(format!("Failed to create job scheduler: {}", e)))?;

    let settings = Arc::new(settings);
    let jobs = [
        (RETENTION_SWEEP, settings.scheduler.retention_sweep.clone()),
        (E2E_CLEANUP, settings.scheduler.e2e_cleanup.clone()),
        (REFRESH_ANSWER_STATS, settings.scheduler.refresh_answer_stats.clone()),
        (
            CLEANUP_RATE_LIMIT_WINDOWS,
            settings.scheduler.cleanup_rate_limit_windows.clone(),
        ),
    ];
    let job_count = jobs.len();

    for (job_name, schedule) in jobs {
        let db = db.clone();
        let settings = settings.clone();

        let job = Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let db = db.clone();
            let settings = settings.clone();
            Box::pin(async move {
                info!("Running {} job", job_name);
                if let Err(e) = trigger_job_manually(&db, &settings, job_name).await {
                    error!("Failed to run {} job: {}", job_name, e);
                }
            })
        })
        .map_err(|e| {
            RetentionError::Other(format!("Failed to create {} job: {}", job_name, e))
        })?;

        sched
            .add(job)
            .await
            .map_err(|e| RetentionError::Other(format!("Failed to add {} job: {}", job_name, e)))?;

        info!(job = job_name, schedule = %schedule, "Scheduled job");
    }

    sched
        .start()
        .await
        .map_err(|e| RetentionError::Other(format!("Failed to start job scheduler: {}", e)))?;

    info!("Job scheduler started with {} jobs", job_count);

    Ok(sched)
}

/// Record the start of a job execution
pub async fn start_job_execution(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<i64, RetentionError> {
    use entities::job_execution;

    let now = Utc::now().timestamp();

    let execution = job_execution::ActiveModel {
        id: Default::default(),
        job_name: Set(job_name.to_string()),
        started_at: Set(now),
        completed_at: Set(None),
        success: Set(None),
        error_message: Set(None),
        records_processed: Set(None),
    };

    let result = execution.insert(db).await?;
    Ok(result.id)
}

/// Record the completion of a job execution
pub async fn complete_job_execution(
    db: &DatabaseConnection,
    execution_id: i64,
    success: bool,
    error_message: Option<String>,
    records_processed: Option<i64>,
) -> Result<(), RetentionError> {
    use entities::job_execution::{Column, Entity};

    let now = Utc::now().timestamp();

    if let Some(execution) = Entity::find()
        .filter(Column::Id.eq(execution_id))
        .one(db)
        .await?
    {
        let mut active: entities::job_execution::ActiveModel = execution.into_active_model();
        active.completed_at = Set(Some(now));
        active.success = Set(Some(if success { 1 } else { 0 }));
        active.error_message = Set(error_message);
        active.records_processed = Set(records_processed);
        active.update(db).await?;
    }

    Ok(())
}

/// Run one job to completion without touching the ledger.
pub async fn run_job(
    db: &DatabaseConnection,
    settings: &Settings,
    job_name: &str,
) -> Result<JobOutcome, RetentionError> {
    let now = Utc::now().timestamp();

    let outcome = match job_name {
        RETENTION_SWEEP => {
            let report = retention::run_retention_sweep(db, &settings.retention, now).await;
            JobOutcome {
                records_processed: report.records_processed(),
                failures: report.failures,
            }
        }
        E2E_CLEANUP => {
            let report = e2e_cleanup::run_e2e_cleanup(db, &settings.e2e_cleanup, now).await;
            JobOutcome {
                records_processed: report.deleted.total(),
                failures: report.failures,
            }
        }
        REFRESH_ANSWER_STATS => JobOutcome {
            records_processed: answer_stats::refresh_answer_stats(db, now).await?,
            failures: 0,
        },
        CLEANUP_RATE_LIMIT_WINDOWS => JobOutcome {
            records_processed: rate_limit::purge_expired_windows(
                db,
                now,
                settings.rate_limit.window_secs,
            )
            .await?,
            failures: 0,
        },
        _ => {
            return Err(RetentionError::Other(format!("Unknown job name: {}", job_name)));
        }
    };

    Ok(outcome)
}

/// Run a job by name and record it in `job_executions`.
///
/// A run that reaches the end counts as successful even when individual
/// items failed; those are summarised in the ledger's error message.
pub async fn trigger_job_manually(
    db: &DatabaseConnection,
    settings: &Settings,
    job_name: &str,
) -> Result<JobOutcome, RetentionError> {
    info!("Triggering job: {}", job_name);
    let execution_id = start_job_execution(db, job_name).await?;

    match run_job(db, settings, job_name).await {
        Ok(outcome) => {
            info!(
                "Job {} completed: {} records, {} item failure(s)",
                job_name, outcome.records_processed, outcome.failures
            );
            let message = (outcome.failures > 0)
                .then(|| format!("{} item failure(s)", outcome.failures));
            complete_job_execution(
                db,
                execution_id,
                true,
                message,
                Some(outcome.records_processed as i64),
            )
            .await?;
            Ok(outcome)
        }
        Err(e) => {
            error!("Job {} failed: {}", job_name, e);
            complete_job_execution(db, execution_id, false, Some(e.to_string()), None).await?;
            Err(e)
        }
    }
}
