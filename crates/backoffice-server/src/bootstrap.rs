//! First-start provisioning of the administrator account.

use backoffice_auth::password;
use backoffice_core::error::{BackofficeError, BackofficeResult};
use backoffice_core::models::operation_log::{CreateOperationLogEntry, LogCategory};
use backoffice_core::models::user::CreateUser;
use backoffice_core::repository::{OperationLogRepository, RoleRepository, UserRepository};
use backoffice_db::DEFAULT_ADMIN_ROLE;
use tracing::{info, warn};

use crate::config::InitialAdmin;

/// Create `admin` and give it the admin role, unless the username is
/// already taken. Returns whether an account was created.
pub async fn ensure_initial_admin<U, R, L>(
    users: &U,
    roles: &R,
    log: &L,
    admin: &InitialAdmin,
    min_password_length: usize,
) -> BackofficeResult<bool>
where
    U: UserRepository,
    R: RoleRepository,
    L: OperationLogRepository,
{
    match users.get_by_username(&admin.username).await {
        Ok(_) => {
            info!(username = %admin.username, "Initial administrator already present");
            return Ok(false);
        }
        Err(BackofficeError::NotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    password::check_policy(&admin.password, min_password_length)?;

    let user = users
        .create(CreateUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            ..Default::default()
        })
        .await?;

    match roles.get_by_name(DEFAULT_ADMIN_ROLE).await {
        Ok(role) => roles.set_user_roles(user.id, &[role.id]).await?,
        Err(BackofficeError::NotFound { .. }) => {
            warn!(role = DEFAULT_ADMIN_ROLE, "Admin role missing, administrator has no roles");
        }
        Err(e) => return Err(e),
    }

    log.append(CreateOperationLogEntry::info(
        None,
        LogCategory::System,
        "create_initial_admin",
        format!("created administrator {}", user.username),
    ))
    .await?;

    info!(user_id = %user.id, username = %user.username, "Initial administrator created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::repository::AuthorizationRepository;
    use backoffice_db::repository::{
        SurrealAuthorizationRepository, SurrealOperationLogRepository, SurrealRoleRepository,
        SurrealUserRepository,
    };
    use surrealdb::Surreal;
    use surrealdb::engine::local::Mem;

    fn admin() -> InitialAdmin {
        InitialAdmin {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "change me please".into(),
        }
    }

    #[tokio::test]
    async fn creates_admin_once() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        backoffice_db::run_migrations(&db).await.unwrap();
        backoffice_db::seed_defaults(&db).await.unwrap();

        let users = SurrealUserRepository::new(db.clone());
        let roles = SurrealRoleRepository::new(db.clone());
        let log = SurrealOperationLogRepository::new(db.clone());

        assert!(ensure_initial_admin(&users, &roles, &log, &admin(), 8).await.unwrap());
        assert!(!ensure_initial_admin(&users, &roles, &log, &admin(), 8).await.unwrap());

        let root = users.get_by_username("root").await.unwrap();
        let authz = SurrealAuthorizationRepository::new(db);
        assert!(authz.has_role(root.id, DEFAULT_ADMIN_ROLE).await.unwrap());
        assert!(authz.has_permission(root.id, "manage_permissions").await.unwrap());
    }

    #[tokio::test]
    async fn weak_password_is_refused() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        backoffice_db::run_migrations(&db).await.unwrap();

        let users = SurrealUserRepository::new(db.clone());
        let roles = SurrealRoleRepository::new(db.clone());
        let log = SurrealOperationLogRepository::new(db);

        let weak = InitialAdmin {
            password: "short".into(),
            ..admin()
        };
        let err = ensure_initial_admin(&users, &roles, &log, &weak, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, BackofficeError::Validation { .. }));
    }
}
