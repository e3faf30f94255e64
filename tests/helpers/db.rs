use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;

/// Migrated SQLite database in a throwaway directory.
///
/// Foreign keys are enforced, so the answer cascade and the restrict
/// constraints behind the E2E deletion order are exercised for real.
pub struct TestDb {
    connection: DatabaseConnection,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("skolapp.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opts = ConnectOptions::new(url);
        opts.max_connections(1).sqlx_logging(false);

        let connection = Database::connect(opts)
            .await
            .expect("Failed to open test database");
        migration::Migrator::up(&connection, None)
            .await
            .expect("Failed to apply migrations");

        Self {
            connection,
            _dir: dir,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
