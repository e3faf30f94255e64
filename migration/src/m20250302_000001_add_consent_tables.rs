use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Per-organization retention settings; NULL columns fall back to defaults
        manager
            .create_table(
                Table::create()
                    .table(OrgRetentionSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrgRetentionSettings::OrgId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(integer_null(OrgRetentionSettings::RetentionKorttidDays))
                    .col(integer_null(OrgRetentionSettings::ConsentValidMonths))
                    .col(
                        ColumnDef::new(OrgRetentionSettings::RequireGuardianConsent)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(big_integer(OrgRetentionSettings::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_org_retention_settings_org")
                            .from(OrgRetentionSettings::Table, OrgRetentionSettings::OrgId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // No uniqueness on (student_id, org_id): the newest active grant wins
        manager
            .create_table(
                Table::create()
                    .table(ConsentRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConsentRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(ConsentRecords::StudentId))
                    .col(string(ConsentRecords::OrgId))
                    .col(string_len(ConsentRecords::Status, 16))
                    .col(big_integer(ConsentRecords::GrantedAt))
                    .col(big_integer(ConsentRecords::ExpiresAt))
                    .col(big_integer_null(ConsentRecords::RevokedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_consent_records_student_org")
                    .table(ConsentRecords::Table)
                    .col(ConsentRecords::StudentId)
                    .col(ConsentRecords::OrgId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_consent_records_status_expires")
                    .table(ConsentRecords::Table)
                    .col(ConsentRecords::Status)
                    .col(ConsentRecords::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ConsentInvites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConsentInvites::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(ConsentInvites::StudentId))
                    .col(string(ConsentInvites::OrgId))
                    .col(string(ConsentInvites::GuardianEmail))
                    .col(string_len(ConsentInvites::Status, 16))
                    .col(big_integer(ConsentInvites::CreatedAt))
                    .col(big_integer(ConsentInvites::ExpiresAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_consent_invites_status_expires")
                    .table(ConsentInvites::Table)
                    .col(ConsentInvites::Status)
                    .col(ConsentInvites::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ConsentInvites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ConsentRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrgRetentionSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum OrgRetentionSettings {
    Table,
    OrgId,
    RetentionKorttidDays,
    ConsentValidMonths,
    RequireGuardianConsent,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ConsentRecords {
    Table,
    Id,
    StudentId,
    OrgId,
    Status,
    GrantedAt,
    ExpiresAt,
    RevokedAt,
}

#[derive(DeriveIden)]
enum ConsentInvites {
    Table,
    Id,
    StudentId,
    OrgId,
    GuardianEmail,
    Status,
    CreatedAt,
    ExpiresAt,
}
