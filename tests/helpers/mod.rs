pub mod builders;
pub mod db;

pub use builders::{AttemptBuilder, ConsentBuilder, OrgBuilder, QuizBuilder, UserBuilder};
pub use db::TestDb;

/// Fixed reference instant for deterministic boundaries (2025-10-09T08:53:20Z).
pub const NOW: i64 = 1_760_000_000;
pub const DAY: i64 = 86_400;
pub const HOUR: i64 = 3_600;
