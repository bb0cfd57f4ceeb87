//! Integration tests for the User repository using in-memory SurrealDB.

use backoffice_core::error::BackofficeError;
use backoffice_core::models::role::CreateRole;
use backoffice_core::models::session::CreateSession;
use backoffice_core::models::user::{CreateUser, UpdateUser};
use backoffice_core::repository::{RoleRepository, SessionRepository, UserRepository};
use backoffice_db::repository::{
    SurrealRoleRepository, SurrealSessionRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    backoffice_db::run_migrations(&db).await.unwrap();
    db
}

fn new_user(username: &str) -> CreateUser {
    CreateUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        password: "correct-horse-battery".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_and_fetch_user() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(CreateUser {
            display_name: Some("Alice A.".into()),
            department: Some("Ops".into()),
            ..new_user("alice")
        })
        .await
        .unwrap();

    assert_eq!(user.username, "alice");
    assert!(user.is_active);
    assert!(user.last_login_at.is_none());
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert_ne!(user.password_hash, "correct-horse-battery");

    let by_id = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(by_id.email, "alice@example.com");
    assert_eq!(by_id.department.as_deref(), Some("Ops"));

    let by_name = repo.get_by_username("alice").await.unwrap();
    assert_eq!(by_name.id, user.id);

    let by_email = repo.get_by_email("alice@example.com").await.unwrap();
    assert_eq!(by_email.id, user.id);
}

#[tokio::test]
async fn duplicate_username_or_email_is_rejected() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(new_user("alice")).await.unwrap();

    let err = repo.create(new_user("alice")).await.unwrap_err();
    assert!(matches!(err, BackofficeError::AlreadyExists { .. }));

    let err = repo
        .create(CreateUser {
            email: "alice@example.com".into(),
            ..new_user("alice2")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BackofficeError::AlreadyExists { .. }));
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let err = repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BackofficeError::NotFound { .. }));

    let err = repo.get_by_username("nobody").await.unwrap_err();
    assert!(matches!(err, BackofficeError::NotFound { .. }));
}

#[tokio::test]
async fn update_sets_and_clears_profile_fields() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(CreateUser {
            phone: Some("555-0100".into()),
            ..new_user("carol")
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                display_name: Some(Some("Carol".into())),
                phone: Some(None),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.display_name.as_deref(), Some("Carol"));
    assert!(updated.phone.is_none());
    assert!(!updated.is_active);
    assert_eq!(updated.username, "carol");
}

#[tokio::test]
async fn update_to_taken_username_is_rejected() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(new_user("dave")).await.unwrap();
    let erin = repo.create(new_user("erin")).await.unwrap();

    let err = repo
        .update(
            erin.id,
            UpdateUser {
                username: Some("dave".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BackofficeError::AlreadyExists { .. }));

    // Keeping one's own name is not a conflict.
    repo.update(
        erin.id,
        UpdateUser {
            username: Some("erin".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn set_password_rehashes() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo.create(new_user("frank")).await.unwrap();
    repo.set_password(user.id, "a-brand-new-secret").await.unwrap();

    let reloaded = repo.get_by_id(user.id).await.unwrap();
    assert_ne!(reloaded.password_hash, user.password_hash);
}

#[tokio::test]
async fn record_login_stamps_timestamp() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo.create(new_user("grace")).await.unwrap();
    repo.record_login(user.id).await.unwrap();

    let reloaded = repo.get_by_id(user.id).await.unwrap();
    assert!(reloaded.last_login_at.is_some());
}

#[tokio::test]
async fn delete_removes_memberships_and_sessions() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let sessions = SurrealSessionRepository::new(db.clone());

    let user = users.create(new_user("heidi")).await.unwrap();
    let role = roles
        .create(CreateRole {
            name: "Editor".into(),
            description: "Edits things".into(),
        })
        .await
        .unwrap();
    roles.set_user_roles(user.id, &[role.id]).await.unwrap();
    let session = sessions
        .create(CreateSession {
            user_id: user.id,
            token_hash: "hash-heidi".into(),
            ip_address: None,
            user_agent: None,
            remember: false,
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
        })
        .await
        .unwrap();

    users.delete(user.id).await.unwrap();

    assert!(matches!(
        users.get_by_id(user.id).await.unwrap_err(),
        BackofficeError::NotFound { .. }
    ));
    assert!(matches!(
        sessions.get_by_id(session.id).await.unwrap_err(),
        BackofficeError::NotFound { .. }
    ));
    // The role lost its only member, so it can now be deleted.
    roles.delete(role.id).await.unwrap();
}

#[tokio::test]
async fn list_users_oldest_first() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    for name in ["u1", "u2", "u3"] {
        repo.create(new_user(name)).await.unwrap();
    }

    let users = repo.list().await.unwrap();
    let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["u1", "u2", "u3"]);
}
