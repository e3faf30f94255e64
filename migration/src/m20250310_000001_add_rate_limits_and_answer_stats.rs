use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Fixed-window counters shared by every instance
        manager
            .create_table(
                Table::create()
                    .table(RateLimitWindows::Table)
                    .if_not_exists()
                    .col(string(RateLimitWindows::Key))
                    .col(big_integer(RateLimitWindows::WindowStart))
                    .col(
                        ColumnDef::new(RateLimitWindows::Count)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(RateLimitWindows::Key)
                            .col(RateLimitWindows::WindowStart),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AnswerStats::Table)
                    .if_not_exists()
                    .col(string(AnswerStats::QuizId))
                    .col(string(AnswerStats::QuestionId))
                    .col(big_integer(AnswerStats::AnswerCount))
                    .col(big_integer(AnswerStats::CorrectCount))
                    .col(big_integer(AnswerStats::RefreshedAt))
                    .primary_key(
                        Index::create()
                            .col(AnswerStats::QuizId)
                            .col(AnswerStats::QuestionId),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnswerStats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RateLimitWindows::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RateLimitWindows {
    Table,
    Key,
    WindowStart,
    Count,
}

#[derive(DeriveIden)]
enum AnswerStats {
    Table,
    QuizId,
    QuestionId,
    AnswerCount,
    CorrectCount,
    RefreshedAt,
}
