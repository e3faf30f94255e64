//! Fixed-window rate limiting for answer submission.
//!
//! [`DatabaseRateLimitStore`] keeps the counters in `rate_limit_windows`, so
//! every instance behind the load balancer sees the same count.
//! [`MemoryRateLimitStore`] is the single-instance fallback; unlike a bare
//! map it evicts finished windows.

use crate::entities;
use crate::errors::RetentionError;
use crate::settings::{RateLimitBackend, RateLimitSettings};
use crate::storage;
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Start of the fixed window containing `now`.
pub fn window_start(now: i64, window_secs: i64) -> i64 {
    now - now.rem_euclid(window_secs)
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` and return the total in the current window.
    async fn hit(&self, key: &str, now: i64, window_secs: i64) -> Result<u64, RetentionError>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: i64,
    count: u64,
}

pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, Window>>,
    max_keys: usize,
}

impl MemoryRateLimitStore {
    pub fn new(max_keys: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_keys,
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, key: &str, now: i64, window_secs: i64) -> Result<u64, RetentionError> {
        let start = window_start(now, window_secs);
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| RetentionError::Other("rate limit state poisoned".to_string()))?;

        if windows.len() >= self.max_keys && !windows.contains_key(key) {
            windows.retain(|_, w| w.start == start);
        }

        let window = windows.entry(key.to_string()).or_insert(Window { start, count: 0 });
        if window.start != start {
            *window = Window { start, count: 0 };
        }
        window.count += 1;
        Ok(window.count)
    }
}

pub struct DatabaseRateLimitStore {
    db: DatabaseConnection,
}

impl DatabaseRateLimitStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RateLimitStore for DatabaseRateLimitStore {
    async fn hit(&self, key: &str, now: i64, window_secs: i64) -> Result<u64, RetentionError> {
        use entities::rate_limit_window::{ActiveModel, Column, Entity};

        let start = window_start(now, window_secs);
        let row = ActiveModel {
            key: Set(key.to_string()),
            window_start: Set(start),
            count: Set(1),
        };

        Entity::insert(row)
            .on_conflict(
                OnConflict::columns([Column::Key, Column::WindowStart])
                    .value(Column::Count, Expr::col((Entity, Column::Count)).add(1))
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        let count = Entity::find_by_id((key.to_string(), start))
            .one(&self.db)
            .await?
            .map(|w| w.count)
            .unwrap_or(1);

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Drop counter rows for windows that have already closed.
pub async fn purge_expired_windows(
    db: &DatabaseConnection,
    now: i64,
    window_secs: i64,
) -> Result<u64, RetentionError> {
    use entities::rate_limit_window::{Column, Entity};

    let result = Entity::delete_many()
        .filter(Column::WindowStart.lt(window_start(now, window_secs)))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: i64 },
}

pub struct RateLimiter {
    store: Box<dyn RateLimitStore>,
    max_requests: u32,
    window_secs: i64,
}

impl RateLimiter {
    pub fn new(store: Box<dyn RateLimitStore>, max_requests: u32, window_secs: i64) -> Self {
        Self {
            store,
            max_requests,
            window_secs,
        }
    }

    pub fn from_settings(cfg: &RateLimitSettings, db: &DatabaseConnection) -> Self {
        let store: Box<dyn RateLimitStore> = match cfg.backend {
            RateLimitBackend::Memory => Box::new(MemoryRateLimitStore::new(cfg.max_keys)),
            RateLimitBackend::Database => Box::new(DatabaseRateLimitStore::new(db.clone())),
        };
        Self::new(store, cfg.max_requests, cfg.window_secs)
    }

    pub async fn check(&self, key: &str, now: i64) -> Result<RateLimitDecision, RetentionError> {
        let count = self.store.hit(key, now, self.window_secs).await?;
        if count > u64::from(self.max_requests) {
            let retry_after = window_start(now, self.window_secs) + self.window_secs - now;
            return Ok(RateLimitDecision::Limited { retry_after });
        }
        Ok(RateLimitDecision::Allowed {
            remaining: self.max_requests - count as u32,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnswer {
    pub attempt_id: String,
    pub question_id: String,
    pub value: String,
    pub is_correct: bool,
}

/// Record an answer, limited per attempt.
pub async fn submit_answer(
    db: &DatabaseConnection,
    limiter: &RateLimiter,
    input: NewAnswer,
    now: i64,
) -> Result<entities::answer::Model, RetentionError> {
    if let RateLimitDecision::Limited { retry_after } = limiter.check(&input.attempt_id, now).await? {
        return Err(RetentionError::RateLimited {
            key: input.attempt_id,
            retry_after,
        });
    }

    if storage::get_attempt(db, &input.attempt_id).await?.is_none() {
        return Err(RetentionError::BadRequest(format!(
            "unknown attempt {}",
            input.attempt_id
        )));
    }

    let answer = entities::answer::ActiveModel {
        id: Set(storage::new_id()),
        attempt_id: Set(input.attempt_id),
        question_id: Set(input.question_id),
        value: Set(input.value),
        is_correct: Set(input.is_correct),
        created_at: Set(now),
    };

    Ok(answer.insert(db).await?)
}
