use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RetentionError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(skolapp::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(skolapp::config))]
    Config(#[from] config::ConfigError),

    #[error("Missing required setting `{0}`")]
    #[diagnostic(
        code(skolapp::config::missing),
        help("set it in the config file or as SKOLAPP__<SECTION>__<KEY>")
    )]
    MissingSetting(String),

    #[error("Database credential uses the anonymous role `{0}`")]
    #[diagnostic(
        code(skolapp::config::anonymous_credential),
        help("the maintenance jobs delete across row-level security; use the service role")
    )]
    AnonymousCredential(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(skolapp::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(skolapp::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Invalid retention policy for organization {org_id}: {reason}")]
    #[diagnostic(code(skolapp::policy))]
    InvalidPolicy { org_id: String, reason: String },

    #[error("Rate limit exceeded for {key}, retry in {retry_after}s")]
    #[diagnostic(code(skolapp::rate_limited))]
    RateLimited { key: String, retry_after: i64 },

    #[error("Bad request: {0}")]
    #[diagnostic(code(skolapp::bad_request))]
    BadRequest(String),

    #[error("{0}")]
    #[diagnostic(code(skolapp::other))]
    Other(String),
}
