//! Concurrent duplicate creation and rollback of audited writes.

use mailroom_core::error::MailroomError;
use mailroom_core::models::audit::{AuditAction, AuditLogFilter, AuditStamp};
use mailroom_core::models::domain::CreateDomain;
use mailroom_core::models::user::{NewUser, Role, UserFilter};
use mailroom_core::repository::{AuditLogRepository, DomainRepository, UserRepository};
use mailroom_db::repository::{
    SurrealAuditLogRepository, SurrealDomainRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

const RACERS: usize = 16;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mailroom_db::run_migrations(&db).await.unwrap();
    db
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$v=19$placeholder".into(),
        first_name: None,
        last_name: None,
        role: Role::Client,
        domain_id: None,
    }
}

fn stamp(action: AuditAction) -> AuditStamp {
    AuditStamp::new(Uuid::new_v4(), action, serde_json::json!({}))
}

async fn audit_count(db: &Surreal<Db>, action: &str) -> usize {
    SurrealAuditLogRepository::new(db.clone())
        .list(
            AuditLogFilter {
                action: Some(action.into()),
                ..AuditLogFilter::default()
            },
            500,
        )
        .await
        .unwrap()
        .len()
}

/// Tally of racing results: (successes, conflicts, anything else).
fn tally<T>(results: Vec<Result<T, MailroomError>>) -> (usize, usize, Vec<String>) {
    let mut ok = 0;
    let mut conflicts = 0;
    let mut other = Vec::new();
    for result in results {
        match result {
            Ok(_) => ok += 1,
            Err(MailroomError::AlreadyExists { .. }) => conflicts += 1,
            Err(e) => other.push(e.to_string()),
        }
    }
    (ok, conflicts, other)
}

#[tokio::test]
async fn concurrent_duplicate_users_all_lose_with_conflict() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db.clone());

    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.create(new_user("dup"), stamp(AuditAction::CreateUser))
                    .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let (ok, conflicts, other) = tally(results);
    assert_eq!(ok, 1);
    assert_eq!(conflicts, RACERS - 1);
    assert!(other.is_empty(), "unexpected errors: {other:?}");

    assert_eq!(repo.list(UserFilter::default()).await.unwrap().len(), 1);
    assert_eq!(audit_count(&db, "CREATE_USER").await, 1);
}

#[tokio::test]
async fn concurrent_duplicate_domains_all_lose_with_conflict() {
    let db = setup().await;
    let repo = SurrealDomainRepository::new(db.clone());

    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.create(
                    CreateDomain {
                        domain: "race.example".into(),
                        description: None,
                    },
                    Uuid::new_v4(),
                    stamp(AuditAction::CreateDomain),
                )
                .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let (ok, conflicts, other) = tally(results);
    assert_eq!(ok, 1);
    assert_eq!(conflicts, RACERS - 1);
    assert!(other.is_empty(), "unexpected errors: {other:?}");

    assert_eq!(repo.list().await.unwrap().len(), 1);
    assert_eq!(audit_count(&db, "CREATE_DOMAIN").await, 1);
}

#[tokio::test]
async fn failed_write_leaves_no_audit_entry() {
    let db = setup().await;
    db.query(
        "DEFINE EVENT reject_user ON TABLE user WHEN $event = 'CREATE' \
         THEN { THROW 'user creation rejected' }",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let repo = SurrealUserRepository::new(db.clone());
    let err = repo
        .create(new_user("alice"), stamp(AuditAction::CreateUser))
        .await
        .unwrap_err();

    assert!(matches!(err, MailroomError::Database(_)), "got {err:?}");
    assert!(matches!(
        repo.get_by_username("alice").await.unwrap_err(),
        MailroomError::NotFound { .. }
    ));
    assert_eq!(audit_count(&db, "CREATE_USER").await, 0);
}

#[tokio::test]
async fn failed_audit_append_rolls_back_the_write() {
    let db = setup().await;
    db.query(
        "DEFINE EVENT reject_audit ON TABLE audit_log WHEN $event = 'CREATE' \
         THEN { THROW 'audit store unavailable' }",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let repo = SurrealUserRepository::new(db.clone());
    let err = repo
        .create(new_user("bob"), stamp(AuditAction::CreateUser))
        .await
        .unwrap_err();

    assert!(matches!(err, MailroomError::Database(_)), "got {err:?}");
    assert!(repo.list(UserFilter::default()).await.unwrap().is_empty());
}
