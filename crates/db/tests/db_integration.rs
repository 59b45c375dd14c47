//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p civic-db --features test-utils --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `civic_test`)
//!   `TEST_DB_PASSWORD` (default: `civic_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use civic_common::AppError;
use civic_db::{
    entities::{
        complaint::{self, ComplaintStatus, Priority},
        complaint_helper::{self, HelperStatus},
        user::{self, UserRole},
    },
    test_utils::{TestDbConfig, TestStore},
};
use sea_orm::Set;

fn new_user(id: &str, email: &str, role: UserRole) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        name: Set(format!("User {id}")),
        email: Set(email.to_string()),
        password_hash: Set("hash".to_string()),
        phone: Set(None),
        address: Set(None),
        role: Set(role),
        organization: Set(None),
        service_area: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
}

fn new_complaint(id: &str, reporter_id: &str) -> complaint::ActiveModel {
    complaint::ActiveModel {
        id: Set(id.to_string()),
        complaint_code: Set("CR20250101000001".to_string()),
        title: Set("Broken streetlight".to_string()),
        description: Set("Out for a week".to_string()),
        category: Set("Streetlight".to_string()),
        priority: Set(Priority::Medium),
        status: Set(ComplaintStatus::Pending),
        address: Set(None),
        latitude: Set(None),
        longitude: Set(None),
        image_url: Set(None),
        assigned_dept: Set(None),
        reported_by_id: Set(reporter_id.to_string()),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
}

fn new_helper(id: &str, complaint_id: &str, ngo_id: &str) -> complaint_helper::ActiveModel {
    complaint_helper::ActiveModel {
        id: Set(id.to_string()),
        complaint_id: Set(complaint_id.to_string()),
        ngo_id: Set(ngo_id.to_string()),
        status: Set(HelperStatus::Helping),
        message: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_email_is_conflict() {
    let db = TestStore::create().await.expect("Failed to create db");
    let users = db.users();

    users
        .create(new_user("u1", "dup@example.com", UserRole::Citizen))
        .await
        .unwrap();
    let second = users
        .create(new_user("u2", "dup@example.com", UserRole::Citizen))
        .await;

    assert!(matches!(second, Err(AppError::Conflict(_))));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_helper_upsert_keeps_one_row_per_pair() {
    let db = TestStore::create().await.expect("Failed to create db");
    let (users, complaints, helpers) = (db.users(), db.complaints(), db.helpers());

    users
        .create(new_user("citizen", "c@example.com", UserRole::Citizen))
        .await
        .unwrap();
    users
        .create(new_user("ngo", "n@example.com", UserRole::Ngo))
        .await
        .unwrap();
    complaints
        .create(new_complaint("c1", "citizen"))
        .await
        .unwrap();

    let first = helpers.upsert(new_helper("h1", "c1", "ngo")).await.unwrap();
    let declined = helpers
        .update_status(first, HelperStatus::Declined)
        .await
        .unwrap();
    assert_eq!(declined.status, HelperStatus::Declined);

    let again = helpers.upsert(new_helper("h2", "c1", "ngo")).await.unwrap();
    assert_eq!(again.id, "h1");
    assert_eq!(again.status, HelperStatus::Helping);

    let rows = helpers.find_by_complaint_with_ngo("c1").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1.as_ref().unwrap().id, "ngo");

    assert_eq!(helpers.delete_for_pair("c1", "ngo").await.unwrap(), 1);
    assert_eq!(helpers.delete_for_pair("c1", "ngo").await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_count_by_reporter() {
    let db = TestStore::create().await.expect("Failed to create db");
    let (users, complaints) = (db.users(), db.complaints());

    users
        .create(new_user("citizen", "c@example.com", UserRole::Citizen))
        .await
        .unwrap();
    complaints
        .create(new_complaint("c1", "citizen"))
        .await
        .unwrap();
    complaints
        .create(new_complaint("c2", "citizen"))
        .await
        .unwrap();

    let counts = complaints.count_by_reporter().await.unwrap();
    assert_eq!(counts, vec![("citizen".to_string(), 2)]);
    assert_eq!(users.count_non_admin().await.unwrap(), 1);

    db.drop_database().await.unwrap();
}

#[test]
fn test_url_targets_named_database() {
    let config = TestDbConfig::default();
    assert!(config.url_for("postgres").starts_with("postgres://"));
    assert!(config.url_for("civic_test_1").ends_with("/civic_test_1"));
}
