use sea_orm_migration::sea_orm::DatabaseBackend;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Organizations::Name))
                    .col(big_integer(Organizations::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Auth identities. Only read by the maintenance jobs.
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(string(Users::Email))
                    .col(string_null(Users::Metadata))
                    .col(big_integer(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Profiles::DisplayName))
                    .col(big_integer(Profiles::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profiles_user")
                            .from(Profiles::Table, Profiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Entitlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entitlements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Entitlements::UserId))
                    .col(string(Entitlements::Plan))
                    .col(big_integer(Entitlements::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_entitlements_user")
                            .from(Entitlements::Table, Entitlements::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Quizzes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Quizzes::Id).string().not_null().primary_key())
                    .col(string_null(Quizzes::OrgId))
                    .col(string(Quizzes::OwnerId))
                    .col(string(Quizzes::Title))
                    .col(big_integer(Quizzes::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quizzes_owner")
                            .from(Quizzes::Table, Quizzes::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Attempts belong to a quiz; answers cascade with their attempt
        manager
            .create_table(
                Table::create()
                    .table(Attempts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Attempts::Id).string().not_null().primary_key())
                    .col(string(Attempts::QuizId))
                    .col(string(Attempts::OrgId))
                    .col(string_null(Attempts::StudentId))
                    .col(string_len(Attempts::DataMode, 8))
                    .col(big_integer(Attempts::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attempts_quiz")
                            .from(Attempts::Table, Attempts::QuizId)
                            .to(Quizzes::Table, Quizzes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attempts_org_mode_created")
                    .table(Attempts::Table)
                    .col(Attempts::OrgId)
                    .col(Attempts::DataMode)
                    .col(Attempts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attempts_student")
                    .table(Attempts::Table)
                    .col(Attempts::StudentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Answers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Answers::Id).string().not_null().primary_key())
                    .col(string(Answers::AttemptId))
                    .col(string(Answers::QuestionId))
                    .col(string(Answers::Value))
                    .col(boolean(Answers::IsCorrect))
                    .col(big_integer(Answers::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answers_attempt")
                            .from(Answers::Table, Answers::AttemptId)
                            .to(Attempts::Table, Attempts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Live session tables use RESTRICT so dependents must go first
        manager
            .create_table(
                Table::create()
                    .table(QuizSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuizSessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(QuizSessions::QuizId))
                    .col(string(QuizSessions::HostId))
                    .col(big_integer(QuizSessions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_sessions_quiz")
                            .from(QuizSessions::Table, QuizSessions::QuizId)
                            .to(Quizzes::Table, Quizzes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SessionParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionParticipants::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(SessionParticipants::SessionId))
                    .col(string_null(SessionParticipants::UserId))
                    .col(string(SessionParticipants::DisplayName))
                    .col(big_integer(SessionParticipants::JoinedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_participants_session")
                            .from(SessionParticipants::Table, SessionParticipants::SessionId)
                            .to(QuizSessions::Table, QuizSessions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Submissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Submissions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Submissions::SessionId))
                    .col(string(Submissions::ParticipantId))
                    .col(string(Submissions::QuestionId))
                    .col(string(Submissions::Value))
                    .col(big_integer(Submissions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_submissions_session")
                            .from(Submissions::Table, Submissions::SessionId)
                            .to(QuizSessions::Table, QuizSessions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_submissions_participant")
                            .from(Submissions::Table, Submissions::ParticipantId)
                            .to(SessionParticipants::Table, SessionParticipants::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Create job_executions table with backend-specific ID type
        let id_col = match manager.get_database_backend() {
            DatabaseBackend::Postgres => ColumnDef::new(JobExecutions::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
            _ => ColumnDef::new(JobExecutions::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
        };

        manager
            .create_table(
                Table::create()
                    .table(JobExecutions::Table)
                    .if_not_exists()
                    .col(id_col)
                    .col(string(JobExecutions::JobName))
                    .col(big_integer(JobExecutions::StartedAt))
                    .col(big_integer_null(JobExecutions::CompletedAt))
                    .col(big_integer_null(JobExecutions::Success))
                    .col(string_null(JobExecutions::ErrorMessage))
                    .col(big_integer_null(JobExecutions::RecordsProcessed))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_job_executions_started")
                    .table(JobExecutions::Table)
                    .col(JobExecutions::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobExecutions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Submissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuizSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Answers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attempts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Quizzes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Entitlements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Metadata,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    UserId,
    DisplayName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Entitlements {
    Table,
    Id,
    UserId,
    Plan,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Quizzes {
    Table,
    Id,
    OrgId,
    OwnerId,
    Title,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Attempts {
    Table,
    Id,
    QuizId,
    OrgId,
    StudentId,
    DataMode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Answers {
    Table,
    Id,
    AttemptId,
    QuestionId,
    Value,
    IsCorrect,
    CreatedAt,
}

#[derive(DeriveIden)]
enum QuizSessions {
    Table,
    Id,
    QuizId,
    HostId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SessionParticipants {
    Table,
    Id,
    SessionId,
    UserId,
    DisplayName,
    JoinedAt,
}

#[derive(DeriveIden)]
enum Submissions {
    Table,
    Id,
    SessionId,
    ParticipantId,
    QuestionId,
    Value,
    CreatedAt,
}

#[derive(DeriveIden)]
enum JobExecutions {
    Table,
    Id,
    JobName,
    StartedAt,
    CompletedAt,
    Success,
    ErrorMessage,
    RecordsProcessed,
}
