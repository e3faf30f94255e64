use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use sea_orm_migration::MigratorTrait;
use skolapp_retention::{jobs, settings, storage};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "skolapp-retention",
    version,
    about = "Consent and data retention maintenance for Skolapp"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "SKOLAPP_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expire consents and invites, then purge attempts that may no longer be kept
    Sweep {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete data owned by synthetic end-to-end test accounts
    E2eCleanup {
        #[arg(long)]
        dry_run: bool,
        /// Only accounts older than this many hours
        #[arg(long)]
        max_age_hours: Option<i64>,
    },
    /// Recompute per-question answer statistics
    RefreshStats,
    /// Apply pending database migrations
    Migrate,
    /// Run all jobs on their cron schedules until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings; flags win over file and environment
    let mut settings = settings::Settings::load(&cli.config)?;
    match &cli.command {
        Command::Sweep { dry_run: true } => settings.retention.dry_run = true,
        Command::E2eCleanup {
            dry_run,
            max_age_hours,
        } => {
            settings.e2e_cleanup.dry_run |= *dry_run;
            if let Some(hours) = max_age_hours {
                settings.e2e_cleanup.max_age_hours = *hours;
            }
        }
        _ => {}
    }
    settings.validate()?;
    tracing::info!(
        retention = ?settings.retention,
        e2e_cleanup = ?settings.e2e_cleanup,
        "Loaded configuration"
    );

    // init storage (database)
    let db = storage::init(&settings.database).await?;

    match cli.command {
        Command::Migrate => {
            migration::Migrator::up(&db, None).await.into_diagnostic()?;
            tracing::info!("Migrations applied");
        }
        Command::Sweep { .. } => {
            jobs::trigger_job_manually(&db, &settings, jobs::RETENTION_SWEEP).await?;
        }
        Command::E2eCleanup { .. } => {
            jobs::trigger_job_manually(&db, &settings, jobs::E2E_CLEANUP).await?;
        }
        Command::RefreshStats => {
            jobs::trigger_job_manually(&db, &settings, jobs::REFRESH_ANSWER_STATS).await?;
        }
        Command::Schedule => {
            let mut sched = jobs::init_scheduler(db, settings).await?;
            tokio::signal::ctrl_c().await.into_diagnostic()?;
            tracing::info!("Shutting down scheduler");
            sched
                .shutdown()
                .await
                .map_err(|e| miette::miette!("Failed to stop scheduler: {}", e))?;
        }
    }

    Ok(())
}
