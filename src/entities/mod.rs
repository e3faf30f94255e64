pub mod answer;
pub mod answer_stat;
pub mod attempt;
pub mod consent_invite;
pub mod consent_record;
pub mod entitlement;
pub mod job_execution;
pub mod org_retention_settings;
pub mod organization;
pub mod profile;
pub mod quiz;
pub mod quiz_session;
pub mod rate_limit_window;
pub mod session_participant;
pub mod submission;
pub mod user;

pub use answer::Entity as Answer;
pub use answer_stat::Entity as AnswerStat;
pub use attempt::Entity as Attempt;
pub use consent_invite::Entity as ConsentInvite;
pub use consent_record::Entity as ConsentRecord;
pub use entitlement::Entity as Entitlement;
pub use job_execution::Entity as JobExecution;
pub use org_retention_settings::Entity as OrgRetentionSettings;
pub use organization::Entity as Organization;
pub use profile::Entity as Profile;
pub use quiz::Entity as Quiz;
pub use quiz_session::Entity as QuizSession;
pub use rate_limit_window::Entity as RateLimitWindow;
pub use session_participant::Entity as SessionParticipant;
pub use submission::Entity as Submission;
pub use user::Entity as User;
