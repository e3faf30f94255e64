//! Per-question answer aggregates, recomputed on a schedule instead of on
//! the answer submission path.

use crate::entities::{answer, answer_stat, attempt};
use crate::errors::RetentionError;
use sea_orm::sea_query::Expr;
use sea_orm::{
    DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};

#[derive(Debug, FromQueryResult)]
struct AggregateRow {
    quiz_id: String,
    question_id: String,
    answer_count: i64,
    correct_count: i64,
}

/// Replace `answer_stats` with fresh counts. Returns the number of rows written.
pub async fn refresh_answer_stats(db: &DatabaseConnection, now: i64) -> Result<u64, RetentionError> {
    let rows = answer::Entity::find()
        .select_only()
        .column_as(attempt::Column::QuizId, "quiz_id")
        .column(answer::Column::QuestionId)
        .column_as(Expr::col((answer::Entity, answer::Column::Id)).count(), "answer_count")
        .column_as(
            Expr::cust("SUM(CASE WHEN answers.is_correct THEN 1 ELSE 0 END)"),
            "correct_count",
        )
        .join(JoinType::InnerJoin, answer::Relation::Attempt.def())
        .group_by(attempt::Column::QuizId)
        .group_by(answer::Column::QuestionId)
        .into_model::<AggregateRow>()
        .all(db)
        .await?;

    let written = rows.len() as u64;
    let models: Vec<answer_stat::ActiveModel> = rows
        .into_iter()
        .map(|r| answer_stat::ActiveModel {
            quiz_id: Set(r.quiz_id),
            question_id: Set(r.question_id),
            answer_count: Set(r.answer_count),
            correct_count: Set(r.correct_count),
            refreshed_at: Set(now),
        })
        .collect();

    // Readers see either the old or the new snapshot
    let txn = db.begin().await?;
    answer_stat::Entity::delete_many().exec(&txn).await?;
    if !models.is_empty() {
        answer_stat::Entity::insert_many(models).exec(&txn).await?;
    }
    txn.commit().await?;

    tracing::debug!(rows = written, "Refreshed answer statistics");
    Ok(written)
}
