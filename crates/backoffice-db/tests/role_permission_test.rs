//! Integration tests for Role and Permission repositories using in-memory SurrealDB.

use backoffice_core::error::BackofficeError;
use backoffice_core::models::permission::{CreatePermission, UpdatePermission};
use backoffice_core::models::role::{CreateRole, UpdateRole};
use backoffice_core::models::user::CreateUser;
use backoffice_core::repository::{PermissionRepository, RoleRepository, UserRepository};
use backoffice_db::repository::{
    SurrealPermissionRepository, SurrealRoleRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    backoffice_db::run_migrations(&db).await.unwrap();
    db
}

fn role(name: &str) -> CreateRole {
    CreateRole {
        name: name.into(),
        description: format!("{name} role"),
    }
}

fn permission(code: &str, module: &str) -> CreatePermission {
    CreatePermission {
        name: code.replace('_', " "),
        code: code.into(),
        module: module.into(),
        description: String::new(),
    }
}

async fn create_user(db: &Surreal<Db>, username: &str) -> Uuid {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "password123".into(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

// -----------------------------------------------------------------------
// Roles
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_get_update_role() {
    let db = setup().await;
    let repo = SurrealRoleRepository::new(db);

    let created = repo.create(role("Editor")).await.unwrap();
    assert_eq!(created.name, "Editor");

    let fetched = repo.get_by_name("Editor").await.unwrap();
    assert_eq!(fetched.id, created.id);

    let updated = repo
        .update(
            created.id,
            UpdateRole {
                description: Some("Edits content".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Editor");
    assert_eq!(updated.description, "Edits content");
}

#[tokio::test]
async fn duplicate_role_name_is_rejected() {
    let db = setup().await;
    let repo = SurrealRoleRepository::new(db);

    repo.create(role("Admin")).await.unwrap();
    let other = repo.create(role("User")).await.unwrap();

    let err = repo.create(role("Admin")).await.unwrap_err();
    assert!(matches!(err, BackofficeError::AlreadyExists { .. }));

    let err = repo
        .update(
            other.id,
            UpdateRole {
                name: Some("Admin".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BackofficeError::AlreadyExists { .. }));
}

#[tokio::test]
async fn role_choices_are_ordered_by_label() {
    let db = setup().await;
    let repo = SurrealRoleRepository::new(db);

    for name in ["Viewer", "Admin", "Manager"] {
        repo.create(role(name)).await.unwrap();
    }

    let labels: Vec<String> = repo
        .choices()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.label)
        .collect();
    assert_eq!(labels, vec!["Admin", "Manager", "Viewer"]);

    assert_eq!(repo.list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn delete_role_with_members_is_rejected() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let bob = create_user(&db, "bob").await;

    let user_role = roles.create(role("User")).await.unwrap();
    roles.set_user_roles(bob, &[user_role.id]).await.unwrap();

    let err = roles.delete(user_role.id).await.unwrap_err();
    assert!(matches!(err, BackofficeError::InUse { .. }));

    // Bob still references an existing role.
    let held = roles.get_user_roles(bob).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].id, user_role.id);

    roles.set_user_roles(bob, &[]).await.unwrap();
    roles.delete(user_role.id).await.unwrap();
    assert!(matches!(
        roles.get_by_id(user_role.id).await.unwrap_err(),
        BackofficeError::NotFound { .. }
    ));
}

#[tokio::test]
async fn delete_role_drops_its_grants() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());

    let temp = roles.create(role("Temp")).await.unwrap();
    let perm = permissions
        .create(permission("view_system", "system"))
        .await
        .unwrap();
    permissions
        .set_role_permissions(temp.id, &[perm.id])
        .await
        .unwrap();

    roles.delete(temp.id).await.unwrap();

    // No grant references the permission any more.
    permissions.delete(perm.id).await.unwrap();
}

// -----------------------------------------------------------------------
// Permissions
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_get_update_permission() {
    let db = setup().await;
    let repo = SurrealPermissionRepository::new(db);

    let created = repo
        .create(permission("manage_users", "system"))
        .await
        .unwrap();
    assert_eq!(created.code, "manage_users");

    let fetched = repo.get_by_code("manage_users").await.unwrap();
    assert_eq!(fetched.id, created.id);

    let updated = repo
        .update(
            created.id,
            UpdatePermission {
                module: Some("admin".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.module, "admin");
    assert_eq!(updated.code, "manage_users");
}

#[tokio::test]
async fn duplicate_permission_code_is_rejected() {
    let db = setup().await;
    let repo = SurrealPermissionRepository::new(db);

    repo.create(permission("view_system", "system"))
        .await
        .unwrap();
    let err = repo
        .create(permission("view_system", "other"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackofficeError::AlreadyExists { .. }));
}

#[tokio::test]
async fn permissions_grouped_by_module() {
    let db = setup().await;
    let repo = SurrealPermissionRepository::new(db);

    repo.create(permission("manage_users", "system"))
        .await
        .unwrap();
    repo.create(permission("view_system", "system"))
        .await
        .unwrap();
    repo.create(permission("view_reports", "reports"))
        .await
        .unwrap();

    let grouped = repo.list_by_module().await.unwrap();
    assert_eq!(grouped.len(), 2);

    let system: Vec<&str> = grouped["system"].iter().map(|p| p.code.as_str()).collect();
    assert_eq!(system, vec!["manage_users", "view_system"]);
    assert_eq!(grouped["reports"].len(), 1);
}

#[tokio::test]
async fn delete_granted_permission_is_rejected() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());

    let admin = roles.create(role("Admin")).await.unwrap();
    let perm = permissions
        .create(permission("manage_roles", "system"))
        .await
        .unwrap();
    permissions
        .set_role_permissions(admin.id, &[perm.id])
        .await
        .unwrap();

    let err = permissions.delete(perm.id).await.unwrap_err();
    assert!(matches!(err, BackofficeError::InUse { .. }));
}

// -----------------------------------------------------------------------
// Replacement semantics
// -----------------------------------------------------------------------

#[tokio::test]
async fn set_user_roles_replaces_without_residue() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let user = create_user(&db, "alice").await;

    let r1 = roles.create(role("R1")).await.unwrap();
    let r2 = roles.create(role("R2")).await.unwrap();
    let r3 = roles.create(role("R3")).await.unwrap();

    roles.set_user_roles(user, &[r1.id, r2.id]).await.unwrap();
    assert_eq!(roles.get_user_roles(user).await.unwrap().len(), 2);

    roles.set_user_roles(user, &[r3.id]).await.unwrap();
    let held = roles.get_user_roles(user).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].id, r3.id);
}

#[tokio::test]
async fn set_user_roles_collapses_duplicates() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let user = create_user(&db, "alice").await;

    let r1 = roles.create(role("R1")).await.unwrap();
    let r2 = roles.create(role("R2")).await.unwrap();

    roles
        .set_user_roles(user, &[r1.id, r1.id, r2.id])
        .await
        .unwrap();

    let names: Vec<String> = roles
        .get_user_roles(user)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["R1", "R2"]);
}

#[tokio::test]
async fn set_user_roles_ignores_unknown_ids() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let user = create_user(&db, "alice").await;

    let r1 = roles.create(role("R1")).await.unwrap();

    roles
        .set_user_roles(user, &[Uuid::new_v4(), r1.id])
        .await
        .unwrap();

    let held = roles.get_user_roles(user).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].id, r1.id);
}

#[tokio::test]
async fn set_user_roles_for_missing_user_is_not_found() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let r1 = roles.create(role("R1")).await.unwrap();

    let err = roles
        .set_user_roles(Uuid::new_v4(), &[r1.id])
        .await
        .unwrap_err();
    assert!(matches!(err, BackofficeError::NotFound { .. }));
}

#[tokio::test]
async fn set_role_permissions_replaces_without_residue() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());

    let admin = roles.create(role("Admin")).await.unwrap();
    let p1 = permissions
        .create(permission("view_system", "system"))
        .await
        .unwrap();
    let p2 = permissions
        .create(permission("manage_users", "system"))
        .await
        .unwrap();
    let p3 = permissions
        .create(permission("manage_roles", "system"))
        .await
        .unwrap();

    permissions
        .set_role_permissions(admin.id, &[p1.id, p2.id, p2.id])
        .await
        .unwrap();
    assert_eq!(
        permissions.get_role_permissions(admin.id).await.unwrap().len(),
        2
    );

    permissions
        .set_role_permissions(admin.id, &[p3.id, Uuid::new_v4()])
        .await
        .unwrap();
    let granted = permissions.get_role_permissions(admin.id).await.unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].code, "manage_roles");
}

#[tokio::test]
async fn set_role_permissions_for_missing_role_is_not_found() {
    let db = setup().await;
    let permissions = SurrealPermissionRepository::new(db);

    let err = permissions
        .set_role_permissions(Uuid::new_v4(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, BackofficeError::NotFound { .. }));
}
