//! Administrative CRUD over users, roles and permissions.
//!
//! Every operation takes the acting [`AuthenticatedUser`], checks the
//! permission guarding its area, performs the store operation and
//! appends an operation log entry attributed to the actor.

use std::collections::BTreeMap;

use backoffice_core::error::{BackofficeError, BackofficeResult};
use backoffice_core::models::operation_log::{
    CreateOperationLogEntry, LogCategory, OperationLogEntry,
};
use backoffice_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use backoffice_core::models::role::{CreateRole, Role, UpdateRole};
use backoffice_core::models::user::{CreateUser, UpdateUser, User};
use backoffice_core::repository::{
    AuthorizationRepository, Choice, OperationLogFilter, OperationLogRepository,
    PermissionRepository, RoleRepository, UserRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::authz::Authorizer;
use crate::config::AuthConfig;
use crate::identity::AuthenticatedUser;
use crate::password;

pub const VIEW_SYSTEM: &str = "view_system";
pub const MANAGE_USERS: &str = "manage_users";
pub const MANAGE_ROLES: &str = "manage_roles";
pub const MANAGE_PERMISSIONS: &str = "manage_permissions";
/// Login and operation history. Seeded into the admin role only.
pub const VIEW_LOGS: &str = "view_logs";

pub struct AdminService<U, R, P, A, L>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    A: AuthorizationRepository,
    L: OperationLogRepository,
{
    users: U,
    roles: R,
    permissions: P,
    authorizer: Authorizer<A>,
    log: L,
    config: AuthConfig,
}

impl<U, R, P, A, L> AdminService<U, R, P, A, L>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    A: AuthorizationRepository,
    L: OperationLogRepository,
{
    pub fn new(
        users: U,
        roles: R,
        permissions: P,
        authorization: A,
        log: L,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
            authorizer: Authorizer::new(authorization),
            log,
            config,
        }
    }

    async fn record(
        &self,
        actor: &AuthenticatedUser,
        category: LogCategory,
        operation: &str,
        details: String,
    ) -> BackofficeResult<()> {
        info!(actor_id = %actor.id(), operation, %details, "Administrative change");
        self.log
            .append(CreateOperationLogEntry {
                ip_address: actor.ip_address().map(str::to_string),
                ..CreateOperationLogEntry::info(Some(actor.id()), category, operation, details)
            })
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------

    pub async fn list_users(&self, actor: &AuthenticatedUser) -> BackofficeResult<Vec<User>> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;
        self.users.list().await
    }

    pub async fn get_user(&self, actor: &AuthenticatedUser, id: Uuid) -> BackofficeResult<User> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;
        self.users.get_by_id(id).await
    }

    pub async fn create_user(
        &self,
        actor: &AuthenticatedUser,
        input: CreateUser,
    ) -> BackofficeResult<User> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;
        password::check_policy(&input.password, self.config.min_password_length)?;

        let user = self.users.create(input).await?;
        self.record(
            actor,
            LogCategory::User,
            "create_user",
            format!("created user {}", user.username),
        )
        .await?;
        Ok(user)
    }

    pub async fn update_user(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        input: UpdateUser,
    ) -> BackofficeResult<User> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;

        let user = self.users.update(id, input).await?;
        self.record(
            actor,
            LogCategory::User,
            "update_user",
            format!("updated user {}", user.username),
        )
        .await?;
        Ok(user)
    }

    pub async fn reset_password(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        new_password: &str,
    ) -> BackofficeResult<()> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;
        password::check_policy(new_password, self.config.min_password_length)?;

        let user = self.users.get_by_id(id).await?;
        self.users.set_password(id, new_password).await?;
        self.record(
            actor,
            LogCategory::User,
            "reset_password",
            format!("reset password of {}", user.username),
        )
        .await
    }

    /// Hard-delete a user. Administrators cannot delete themselves.
    pub async fn delete_user(&self, actor: &AuthenticatedUser, id: Uuid) -> BackofficeResult<()> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;
        if id == actor.id() {
            return Err(BackofficeError::Validation {
                message: "cannot delete your own account".into(),
            });
        }

        let user = self.users.get_by_id(id).await?;
        self.users.delete(id).await?;
        self.record(
            actor,
            LogCategory::User,
            "delete_user",
            format!("deleted user {}", user.username),
        )
        .await
    }

    pub async fn user_roles(
        &self,
        actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> BackofficeResult<Vec<Role>> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;
        self.roles.get_user_roles(user_id).await
    }

    /// Replace the user's roles with exactly `role_ids`.
    pub async fn set_user_roles(
        &self,
        actor: &AuthenticatedUser,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> BackofficeResult<()> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;

        self.roles.set_user_roles(user_id, role_ids).await?;
        let names: Vec<String> = self
            .roles
            .get_user_roles(user_id)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();
        self.record(
            actor,
            LogCategory::User,
            "set_user_roles",
            format!("user {user_id} roles: [{}]", names.join(", ")),
        )
        .await
    }

    /// Role choices for the user form.
    pub async fn role_choices(&self, actor: &AuthenticatedUser) -> BackofficeResult<Vec<Choice>> {
        self.authorizer.require_permission(actor, MANAGE_USERS).await?;
        self.roles.choices().await
    }

    // -------------------------------------------------------------------
    // Roles
    // -------------------------------------------------------------------

    pub async fn list_roles(&self, actor: &AuthenticatedUser) -> BackofficeResult<Vec<Role>> {
        self.authorizer.require_permission(actor, MANAGE_ROLES).await?;
        self.roles.list().await
    }

    pub async fn create_role(
        &self,
        actor: &AuthenticatedUser,
        input: CreateRole,
    ) -> BackofficeResult<Role> {
        self.authorizer.require_permission(actor, MANAGE_ROLES).await?;

        let role = self.roles.create(input).await?;
        self.record(
            actor,
            LogCategory::Role,
            "create_role",
            format!("created role {}", role.name),
        )
        .await?;
        Ok(role)
    }

    pub async fn update_role(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        input: UpdateRole,
    ) -> BackofficeResult<Role> {
        self.authorizer.require_permission(actor, MANAGE_ROLES).await?;

        let role = self.roles.update(id, input).await?;
        self.record(
            actor,
            LogCategory::Role,
            "update_role",
            format!("updated role {}", role.name),
        )
        .await?;
        Ok(role)
    }

    /// Rejected with `InUse` while any user holds the role.
    pub async fn delete_role(&self, actor: &AuthenticatedUser, id: Uuid) -> BackofficeResult<()> {
        self.authorizer.require_permission(actor, MANAGE_ROLES).await?;

        let role = self.roles.get_by_id(id).await?;
        self.roles.delete(id).await?;
        self.record(
            actor,
            LogCategory::Role,
            "delete_role",
            format!("deleted role {}", role.name),
        )
        .await
    }

    pub async fn role_permissions(
        &self,
        actor: &AuthenticatedUser,
        role_id: Uuid,
    ) -> BackofficeResult<Vec<Permission>> {
        self.authorizer.require_permission(actor, MANAGE_ROLES).await?;
        self.permissions.get_role_permissions(role_id).await
    }

    /// Replace the role's grants with exactly `permission_ids`.
    pub async fn set_role_permissions(
        &self,
        actor: &AuthenticatedUser,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> BackofficeResult<()> {
        self.authorizer.require_permission(actor, MANAGE_ROLES).await?;

        self.permissions
            .set_role_permissions(role_id, permission_ids)
            .await?;
        let role = self.roles.get_by_id(role_id).await?;
        let codes: Vec<String> = self
            .permissions
            .get_role_permissions(role_id)
            .await?
            .into_iter()
            .map(|p| p.code)
            .collect();
        self.record(
            actor,
            LogCategory::Role,
            "set_role_permissions",
            format!("role {} permissions: [{}]", role.name, codes.join(", ")),
        )
        .await
    }

    /// Permission choices for the role form.
    pub async fn permission_choices(
        &self,
        actor: &AuthenticatedUser,
    ) -> BackofficeResult<Vec<Choice>> {
        self.authorizer.require_permission(actor, MANAGE_ROLES).await?;
        self.permissions.choices().await
    }

    // -------------------------------------------------------------------
    // Permissions
    // -------------------------------------------------------------------

    pub async fn permissions_by_module(
        &self,
        actor: &AuthenticatedUser,
    ) -> BackofficeResult<BTreeMap<String, Vec<Permission>>> {
        self.authorizer
            .require_permission(actor, MANAGE_PERMISSIONS)
            .await?;
        self.permissions.list_by_module().await
    }

    pub async fn list_permissions(
        &self,
        actor: &AuthenticatedUser,
    ) -> BackofficeResult<Vec<Permission>> {
        self.authorizer
            .require_permission(actor, MANAGE_PERMISSIONS)
            .await?;
        self.permissions.list().await
    }

    pub async fn create_permission(
        &self,
        actor: &AuthenticatedUser,
        input: CreatePermission,
    ) -> BackofficeResult<Permission> {
        self.authorizer
            .require_permission(actor, MANAGE_PERMISSIONS)
            .await?;

        let permission = self.permissions.create(input).await?;
        self.record(
            actor,
            LogCategory::Permission,
            "create_permission",
            format!("created permission {}", permission.code),
        )
        .await?;
        Ok(permission)
    }

    pub async fn update_permission(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        input: UpdatePermission,
    ) -> BackofficeResult<Permission> {
        self.authorizer
            .require_permission(actor, MANAGE_PERMISSIONS)
            .await?;

        let permission = self.permissions.update(id, input).await?;
        self.record(
            actor,
            LogCategory::Permission,
            "update_permission",
            format!("updated permission {}", permission.code),
        )
        .await?;
        Ok(permission)
    }

    /// Rejected with `InUse` while any role grants the permission.
    pub async fn delete_permission(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> BackofficeResult<()> {
        self.authorizer
            .require_permission(actor, MANAGE_PERMISSIONS)
            .await?;

        let permission = self.permissions.get_by_id(id).await?;
        self.permissions.delete(id).await?;
        self.record(
            actor,
            LogCategory::Permission,
            "delete_permission",
            format!("deleted permission {}", permission.code),
        )
        .await
    }

    // -------------------------------------------------------------------
    // Operation log
    // -------------------------------------------------------------------

    pub async fn operation_logs(
        &self,
        actor: &AuthenticatedUser,
        filter: OperationLogFilter,
    ) -> BackofficeResult<Vec<OperationLogEntry>> {
        self.authorizer.require_permission(actor, VIEW_LOGS).await?;
        self.log.list(filter).await
    }
}
