// Integration tests for data mode resolution at attempt creation
//
// These tests verify:
// 1. Anonymous participation is always short-term
// 2. Only an active consent in the quiz's organization yields long-term
// 3. Lookup failures fall back to short-term instead of failing

mod helpers;

use helpers::{ConsentBuilder, OrgBuilder, QuizBuilder, TestDb, UserBuilder, DAY, NOW};
use sea_orm::ConnectionTrait;
use skolapp_retention::data_mode::{create_attempt, resolve_data_mode, NewAttempt};
use skolapp_retention::entities::attempt::DataMode;
use skolapp_retention::entities::consent_record::ConsentStatus;
use skolapp_retention::errors::RetentionError;
use skolapp_retention::policy::{get_policy, set_policy, PolicyUpdate};
use skolapp_retention::settings::RetentionSettings;
use skolapp_retention::storage;

#[tokio::test]
async fn test_anonymous_is_short_even_with_consents() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org = OrgBuilder::new("Skolan").create(db).await;
    ConsentBuilder::new("student-1", &org.id).create(db).await;

    let mode = resolve_data_mode(db, None, &org.id, &defaults, NOW).await;
    assert_eq!(mode, DataMode::Short);
}

#[tokio::test]
async fn test_active_consent_resolves_long() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org = OrgBuilder::new("Skolan").create(db).await;
    storage::grant_consent(db, "student-1", &org.id, 12, NOW - DAY)
        .await
        .expect("Failed to grant consent");

    let mode = resolve_data_mode(db, Some("student-1"), &org.id, &defaults, NOW).await;
    assert_eq!(mode, DataMode::Long);
}

#[tokio::test]
async fn test_inactive_consents_resolve_short() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org = OrgBuilder::new("Skolan").create(db).await;

    // Still marked granted, but already past its expiry
    ConsentBuilder::new("student-1", &org.id)
        .expires_at(NOW - 1)
        .create(db)
        .await;
    ConsentBuilder::new("student-2", &org.id)
        .status(ConsentStatus::Revoked)
        .create(db)
        .await;
    ConsentBuilder::new("student-3", &org.id)
        .status(ConsentStatus::Expired)
        .expires_at(NOW - DAY)
        .create(db)
        .await;

    for student in ["student-1", "student-2", "student-3", "student-4"] {
        let mode = resolve_data_mode(db, Some(student), &org.id, &defaults, NOW).await;
        assert_eq!(mode, DataMode::Short, "{} should be short-term", student);
    }
}

#[tokio::test]
async fn test_consent_in_other_organization_does_not_count() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org_a = OrgBuilder::new("Skola A").create(db).await;
    let org_b = OrgBuilder::new("Skola B").create(db).await;
    ConsentBuilder::new("student-1", &org_a.id).create(db).await;

    assert_eq!(
        resolve_data_mode(db, Some("student-1"), &org_a.id, &defaults, NOW).await,
        DataMode::Long
    );
    assert_eq!(
        resolve_data_mode(db, Some("student-1"), &org_b.id, &defaults, NOW).await,
        DataMode::Short
    );
}

#[tokio::test]
async fn test_org_without_guardian_consent_is_short() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org = OrgBuilder::new("Skolan").without_guardian_consent().create(db).await;
    ConsentBuilder::new("student-1", &org.id).create(db).await;

    let mode = resolve_data_mode(db, Some("student-1"), &org.id, &defaults, NOW).await;
    assert_eq!(mode, DataMode::Short);
}

#[tokio::test]
async fn test_lookup_failure_falls_back_to_short() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org = OrgBuilder::new("Skolan").create(db).await;
    ConsentBuilder::new("student-1", &org.id).create(db).await;

    db.execute_unprepared("DROP TABLE consent_records")
        .await
        .expect("Failed to drop table");

    let mode = resolve_data_mode(db, Some("student-1"), &org.id, &defaults, NOW).await;
    assert_eq!(mode, DataMode::Short);
}

#[tokio::test]
async fn test_malformed_policy_falls_back_to_short() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org = OrgBuilder::new("Skolan").consent_valid_months(0).create(db).await;
    ConsentBuilder::new("student-1", &org.id).create(db).await;

    let mode = resolve_data_mode(db, Some("student-1"), &org.id, &defaults, NOW).await;
    assert_eq!(mode, DataMode::Short);
}

#[tokio::test]
async fn test_create_attempt_copies_quiz_organization() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let owner = UserBuilder::new("larare@example.se").create(db).await;
    let org = OrgBuilder::new("Skolan").create(db).await;
    let quiz = QuizBuilder::new(&owner.id).in_org(&org.id).create(db).await;
    ConsentBuilder::new("student-1", &org.id).create(db).await;

    let attempt = create_attempt(
        db,
        NewAttempt {
            quiz_id: quiz.id.clone(),
            student_id: Some("student-1".to_string()),
        },
        &defaults,
        NOW,
    )
    .await
    .expect("Failed to create attempt");

    assert_eq!(attempt.org_id, org.id);
    assert_eq!(attempt.quiz_id, quiz.id);
    assert_eq!(attempt.data_mode, DataMode::Long);
    assert_eq!(attempt.created_at, NOW);

    let guest = create_attempt(
        db,
        NewAttempt {
            quiz_id: quiz.id.clone(),
            student_id: None,
        },
        &defaults,
        NOW,
    )
    .await
    .expect("Failed to create guest attempt");
    assert_eq!(guest.data_mode, DataMode::Short);
}

#[tokio::test]
async fn test_create_attempt_rejects_quiz_without_organization() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let owner = UserBuilder::new("larare@example.se").create(db).await;
    let quiz = QuizBuilder::new(&owner.id).create(db).await;

    let result = create_attempt(
        db,
        NewAttempt {
            quiz_id: quiz.id,
            student_id: Some("student-1".to_string()),
        },
        &defaults,
        NOW,
    )
    .await;
    assert!(matches!(result, Err(RetentionError::BadRequest(_))));

    let result = create_attempt(
        db,
        NewAttempt {
            quiz_id: "no-such-quiz".to_string(),
            student_id: None,
        },
        &defaults,
        NOW,
    )
    .await;
    assert!(matches!(result, Err(RetentionError::BadRequest(_))));
}

#[tokio::test]
async fn test_set_policy_round_trips_and_rejects_malformed() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let defaults = RetentionSettings::default();

    let org = OrgBuilder::new("Skolan").create(db).await;
    ConsentBuilder::new("student-1", &org.id).create(db).await;

    let update = PolicyUpdate {
        retention_korttid_days: Some(14),
        consent_valid_months: None,
        require_guardian_consent: true,
    };
    set_policy(db, &org.id, update, &defaults).await.unwrap();

    let policy = get_policy(db, &org.id, &defaults).await.unwrap();
    assert_eq!(policy.retention_korttid_days, 14);
    assert_eq!(policy.consent_valid_months, 12);

    // Switching the consent flow off turns new attempts short-term
    let update = PolicyUpdate {
        retention_korttid_days: Some(14),
        consent_valid_months: None,
        require_guardian_consent: false,
    };
    set_policy(db, &org.id, update, &defaults).await.unwrap();
    assert_eq!(
        resolve_data_mode(db, Some("student-1"), &org.id, &defaults, NOW).await,
        DataMode::Short
    );

    let malformed = PolicyUpdate {
        retention_korttid_days: Some(0),
        consent_valid_months: None,
        require_guardian_consent: true,
    };
    let result = set_policy(db, &org.id, malformed, &defaults).await;
    assert!(matches!(result, Err(RetentionError::InvalidPolicy { .. })));

    // The stored row is unchanged
    let policy = get_policy(db, &org.id, &defaults).await.unwrap();
    assert_eq!(policy.retention_korttid_days, 14);
    assert!(!policy.require_guardian_consent);
}
