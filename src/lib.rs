//! Skolapp retention - consent and data retention maintenance
//!
//! Owns the guardian consent lifecycle for student quiz data: the data mode
//! chosen when an attempt starts, and the scheduled sweeps that expire
//! consents and purge data that may no longer be kept.

pub mod answer_stats;
pub mod data_mode;
pub mod e2e_cleanup;
pub mod entities;
pub mod errors;
pub mod jobs;
pub mod policy;
pub mod rate_limit;
pub mod retention;
pub mod settings;
pub mod storage;
