#![allow(dead_code)]

use skolapp_retention::entities;
use skolapp_retention::entities::attempt::DataMode;
use skolapp_retention::entities::consent_record::ConsentStatus;
use skolapp_retention::storage;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use super::NOW;

/// Builder for organizations with optional retention settings
pub struct OrgBuilder {
    name: String,
    korttid_days: Option<i32>,
    consent_valid_months: Option<i32>,
    require_guardian_consent: bool,
    with_settings: bool,
}

impl OrgBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            korttid_days: None,
            consent_valid_months: None,
            require_guardian_consent: true,
            with_settings: false,
        }
    }

    /// Stored as-is, so malformed values can be seeded
    pub fn korttid_days(mut self, days: i32) -> Self {
        self.korttid_days = Some(days);
        self.with_settings = true;
        self
    }

    pub fn consent_valid_months(mut self, months: i32) -> Self {
        self.consent_valid_months = Some(months);
        self.with_settings = true;
        self
    }

    pub fn without_guardian_consent(mut self) -> Self {
        self.require_guardian_consent = false;
        self.with_settings = true;
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> entities::organization::Model {
        let org = storage::create_organization(db, &self.name, NOW - 400 * super::DAY)
            .await
            .expect("Failed to create organization");

        if self.with_settings {
            entities::org_retention_settings::ActiveModel {
                org_id: Set(org.id.clone()),
                retention_korttid_days: Set(self.korttid_days),
                consent_valid_months: Set(self.consent_valid_months),
                require_guardian_consent: Set(self.require_guardian_consent),
                updated_at: Set(NOW),
            }
            .insert(db)
            .await
            .expect("Failed to insert retention settings");
        }

        org
    }
}

/// Builder for auth identities
pub struct UserBuilder {
    email: String,
    metadata: Option<serde_json::Value>,
    created_at: i64,
}

impl UserBuilder {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            metadata: None,
            created_at: NOW - 30 * super::DAY,
        }
    }

    pub fn e2e_test_account(mut self) -> Self {
        self.metadata = Some(serde_json::json!({ "e2e_test": true }));
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn created_at(mut self, ts: i64) -> Self {
        self.created_at = ts;
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> entities::user::Model {
        entities::user::ActiveModel {
            id: Set(storage::new_id()),
            email: Set(self.email),
            metadata: Set(self.metadata.map(|m| m.to_string())),
            created_at: Set(self.created_at),
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }
}

/// Builder for quizzes
pub struct QuizBuilder {
    owner_id: String,
    org_id: Option<String>,
    title: String,
}

impl QuizBuilder {
    pub fn new(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            org_id: None,
            title: "Glosor vecka 12".to_string(),
        }
    }

    pub fn in_org(mut self, org_id: &str) -> Self {
        self.org_id = Some(org_id.to_string());
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> entities::quiz::Model {
        entities::quiz::ActiveModel {
            id: Set(storage::new_id()),
            org_id: Set(self.org_id),
            owner_id: Set(self.owner_id),
            title: Set(self.title),
            created_at: Set(NOW - 60 * super::DAY),
        }
        .insert(db)
        .await
        .expect("Failed to create test quiz")
    }
}

/// Builder for attempts with an explicit mode and age
pub struct AttemptBuilder {
    quiz_id: String,
    org_id: String,
    student_id: Option<String>,
    data_mode: DataMode,
    created_at: i64,
}

impl AttemptBuilder {
    pub fn new(quiz: &entities::quiz::Model) -> Self {
        Self {
            quiz_id: quiz.id.clone(),
            org_id: quiz.org_id.clone().expect("Quiz needs an organization"),
            student_id: None,
            data_mode: DataMode::Short,
            created_at: NOW,
        }
    }

    pub fn student(mut self, student_id: &str) -> Self {
        self.student_id = Some(student_id.to_string());
        self
    }

    pub fn long(mut self) -> Self {
        self.data_mode = DataMode::Long;
        self
    }

    pub fn created_at(mut self, ts: i64) -> Self {
        self.created_at = ts;
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> entities::attempt::Model {
        storage::insert_attempt(
            db,
            &self.quiz_id,
            &self.org_id,
            self.student_id,
            self.data_mode,
            self.created_at,
        )
        .await
        .expect("Failed to create test attempt")
    }
}

/// Builder for consent records in any state
pub struct ConsentBuilder {
    student_id: String,
    org_id: String,
    status: ConsentStatus,
    granted_at: i64,
    expires_at: i64,
}

impl ConsentBuilder {
    pub fn new(student_id: &str, org_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            org_id: org_id.to_string(),
            status: ConsentStatus::Granted,
            granted_at: NOW - 100 * super::DAY,
            expires_at: NOW + 200 * super::DAY,
        }
    }

    pub fn status(mut self, status: ConsentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn granted_at(mut self, ts: i64) -> Self {
        self.granted_at = ts;
        self
    }

    pub fn expires_at(mut self, ts: i64) -> Self {
        self.expires_at = ts;
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> entities::consent_record::Model {
        let revoked_at = (self.status == ConsentStatus::Revoked).then_some(NOW - super::DAY);
        entities::consent_record::ActiveModel {
            id: Set(storage::new_id()),
            student_id: Set(self.student_id),
            org_id: Set(self.org_id),
            status: Set(self.status),
            granted_at: Set(self.granted_at),
            expires_at: Set(self.expires_at),
            revoked_at: Set(revoked_at),
        }
        .insert(db)
        .await
        .expect("Failed to create test consent")
    }
}
