//! Integration tests for the Session and Operation log repositories using
//! in-memory SurrealDB.

use backoffice_core::error::BackofficeError;
use backoffice_core::models::operation_log::{CreateOperationLogEntry, LogCategory, LogLevel};
use backoffice_core::models::session::CreateSession;
use backoffice_core::models::user::CreateUser;
use backoffice_core::repository::{
    OperationLogFilter, OperationLogRepository, SessionRepository, UserRepository,
};
use backoffice_db::repository::{
    SurrealOperationLogRepository, SurrealSessionRepository, SurrealUserRepository,
};
use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> (Surreal<Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    backoffice_db::run_migrations(&db).await.unwrap();

    let user = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "password123".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    (db, user.id)
}

fn session(user_id: Uuid, token_hash: &str, ttl: Duration) -> CreateSession {
    CreateSession {
        user_id,
        token_hash: token_hash.into(),
        ip_address: Some("10.0.0.1".into()),
        user_agent: Some("test-agent".into()),
        remember: false,
        expires_at: Utc::now() + ttl,
    }
}

// -----------------------------------------------------------------------
// Sessions
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_lookup_session() {
    let (db, user_id) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    let created = repo
        .create(CreateSession {
            remember: true,
            ..session(user_id, "hash-1", Duration::hours(1))
        })
        .await
        .unwrap();
    assert_eq!(created.user_id, user_id);
    assert!(created.remember);

    let by_hash = repo.get_by_token_hash("hash-1").await.unwrap();
    assert_eq!(by_hash.id, created.id);
    assert_eq!(by_hash.ip_address.as_deref(), Some("10.0.0.1"));

    let err = repo.get_by_token_hash("unknown").await.unwrap_err();
    assert!(matches!(err, BackofficeError::NotFound { .. }));
}

#[tokio::test]
async fn invalidate_single_and_all_sessions() {
    let (db, user_id) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    let s1 = repo
        .create(session(user_id, "hash-a", Duration::hours(1)))
        .await
        .unwrap();
    let s2 = repo
        .create(session(user_id, "hash-b", Duration::hours(1)))
        .await
        .unwrap();
    let s3 = repo
        .create(session(user_id, "hash-c", Duration::hours(1)))
        .await
        .unwrap();

    repo.invalidate(s1.id).await.unwrap();
    assert!(repo.get_by_id(s1.id).await.is_err());
    assert!(repo.get_by_id(s2.id).await.is_ok());

    repo.invalidate_user_sessions(user_id).await.unwrap();
    assert!(repo.get_by_id(s2.id).await.is_err());
    assert!(repo.get_by_id(s3.id).await.is_err());
}

#[tokio::test]
async fn cleanup_removes_only_expired_sessions() {
    let (db, user_id) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    repo.create(session(user_id, "old-1", -Duration::minutes(5)))
        .await
        .unwrap();
    repo.create(session(user_id, "old-2", -Duration::hours(2)))
        .await
        .unwrap();
    let live = repo
        .create(session(user_id, "live", Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(repo.cleanup_expired().await.unwrap(), 2);
    assert!(repo.get_by_id(live.id).await.is_ok());
    assert_eq!(repo.cleanup_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn invalidate_other_sessions_keeps_current() {
    let (db, user_id) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    let current = repo
        .create(session(user_id, "current", Duration::hours(1)))
        .await
        .unwrap();
    let other = repo
        .create(session(user_id, "other", Duration::hours(1)))
        .await
        .unwrap();

    repo.invalidate_other_sessions(user_id, current.id)
        .await
        .unwrap();
    assert!(repo.get_by_id(current.id).await.is_ok());
    assert!(repo.get_by_id(other.id).await.is_err());
}

#[tokio::test]
async fn failed_session_deletes_are_reported() {
    let (db, user_id) = setup().await;
    let repo = SurrealSessionRepository::new(db.clone());

    let live = repo
        .create(session(user_id, "locked", Duration::hours(1)))
        .await
        .unwrap();
    repo.create(session(user_id, "stale", -Duration::hours(1)))
        .await
        .unwrap();

    // Make every session delete fail inside the store.
    db.query(
        "DEFINE EVENT lock_sessions ON TABLE session \
         WHEN $event = 'DELETE' THEN { THROW 'sessions are locked' };",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let err = repo.invalidate(live.id).await.unwrap_err();
    assert!(matches!(err, BackofficeError::Database(_)));
    assert!(repo.invalidate_user_sessions(user_id).await.is_err());
    assert!(
        repo.invalidate_other_sessions(user_id, live.id)
            .await
            .is_err()
    );
    assert!(repo.cleanup_expired().await.is_err());

    assert!(repo.get_by_id(live.id).await.is_ok());
}

// -----------------------------------------------------------------------
// Operation log
// -----------------------------------------------------------------------

#[tokio::test]
async fn append_and_list_newest_first() {
    let (db, user_id) = setup().await;
    let repo = SurrealOperationLogRepository::new(db);

    repo.append(CreateOperationLogEntry::info(
        Some(user_id),
        LogCategory::Auth,
        "login",
        "alice logged in",
    ))
    .await
    .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let latest = repo
        .append(CreateOperationLogEntry {
            level: LogLevel::Warning,
            ip_address: Some("10.0.0.2".into()),
            ..CreateOperationLogEntry::info(
                Some(user_id),
                LogCategory::Role,
                "set_user_roles",
                "replaced roles",
            )
        })
        .await
        .unwrap();
    assert_eq!(latest.level, LogLevel::Warning);
    assert_eq!(latest.actor_id, Some(user_id));

    let entries = repo.list(OperationLogFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].operation, "set_user_roles");
    assert_eq!(entries[1].operation, "login");
}

#[tokio::test]
async fn list_filters_by_category_and_actor() {
    let (db, user_id) = setup().await;
    let repo = SurrealOperationLogRepository::new(db);

    repo.append(CreateOperationLogEntry::info(
        Some(user_id),
        LogCategory::Auth,
        "login",
        "",
    ))
    .await
    .unwrap();
    repo.append(CreateOperationLogEntry::info(
        None,
        LogCategory::System,
        "seed_defaults",
        "",
    ))
    .await
    .unwrap();

    let auth_only = repo
        .list(OperationLogFilter {
            category: Some(LogCategory::Auth),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(auth_only.len(), 1);
    assert_eq!(auth_only[0].category, LogCategory::Auth);

    let by_actor = repo
        .list(OperationLogFilter {
            actor_id: Some(user_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_actor.len(), 1);

    let future_only = repo
        .list(OperationLogFilter {
            from: Some(Utc::now() + Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(future_only.is_empty());
}
