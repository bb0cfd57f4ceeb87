//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Services are generic over these
//! traits so that they carry no dependency on the database crate.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::BackofficeResult;
use crate::models::{
    operation_log::{CreateOperationLogEntry, LogCategory, OperationLogEntry},
    permission::{CreatePermission, Permission, UpdatePermission},
    role::{CreateRole, Role, UpdateRole},
    session::{CreateSession, Session},
    user::{CreateUser, UpdateUser, User},
};

/// An `(id, label)` pair for selection lists, ordered by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: Uuid,
    pub label: String,
}

// ---------------------------------------------------------------------------
// Identity store
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = BackofficeResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BackofficeResult<User>> + Send;
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = BackofficeResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = BackofficeResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = BackofficeResult<User>> + Send;
    /// Re-hash and store a new raw password.
    fn set_password(
        &self,
        id: Uuid,
        password: &str,
    ) -> impl Future<Output = BackofficeResult<()>> + Send;
    /// Stamp `last_login_at` with the current time.
    fn record_login(&self, id: Uuid) -> impl Future<Output = BackofficeResult<()>> + Send;
    /// Hard delete. Role memberships and sessions of the user are removed
    /// in the same transaction.
    fn delete(&self, id: Uuid) -> impl Future<Output = BackofficeResult<()>> + Send;
    /// All users, oldest first.
    fn list(&self) -> impl Future<Output = BackofficeResult<Vec<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Role store + user↔role membership
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = BackofficeResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BackofficeResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = BackofficeResult<Role>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = BackofficeResult<Role>> + Send;
    /// Delete a role and its permission grants.
    ///
    /// Rejected with `InUse` while any user still holds the role.
    fn delete(&self, id: Uuid) -> impl Future<Output = BackofficeResult<()>> + Send;
    fn list(&self) -> impl Future<Output = BackofficeResult<Vec<Role>>> + Send;
    /// All roles as selection choices, ordered by name.
    fn choices(&self) -> impl Future<Output = BackofficeResult<Vec<Choice>>> + Send;

    /// Get all roles held by a user.
    fn get_user_roles(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = BackofficeResult<Vec<Role>>> + Send;

    /// Replace the user's entire role membership with exactly `role_ids`.
    ///
    /// Unknown ids are ignored and duplicates collapse. The delete and
    /// insert run in one transaction, so readers see either the old or
    /// the new set.
    fn set_user_roles(
        &self,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = BackofficeResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Permission store + role↔permission grants
// ---------------------------------------------------------------------------

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = BackofficeResult<Permission>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BackofficeResult<Permission>> + Send;
    fn get_by_code(&self, code: &str)
    -> impl Future<Output = BackofficeResult<Permission>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = BackofficeResult<Permission>> + Send;
    /// Delete a permission.
    ///
    /// Rejected with `InUse` while any role still grants it.
    fn delete(&self, id: Uuid) -> impl Future<Output = BackofficeResult<()>> + Send;
    /// All permissions ordered by code.
    fn list(&self) -> impl Future<Output = BackofficeResult<Vec<Permission>>> + Send;
    /// All permissions grouped by module label, each group ordered by code.
    fn list_by_module(
        &self,
    ) -> impl Future<Output = BackofficeResult<BTreeMap<String, Vec<Permission>>>> + Send;
    /// All permissions as selection choices, ordered by name.
    fn choices(&self) -> impl Future<Output = BackofficeResult<Vec<Choice>>> + Send;

    /// Get all permissions granted to a role.
    fn get_role_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = BackofficeResult<Vec<Permission>>> + Send;

    /// Replace the role's entire permission set with exactly
    /// `permission_ids`. Same ignore/dedup/atomicity rules as
    /// [`RoleRepository::set_user_roles`].
    fn set_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> impl Future<Output = BackofficeResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Authorization evaluator (read-only)
// ---------------------------------------------------------------------------

/// Membership checks answered by a single existence query in the store.
///
/// Both operations are side-effect-free. Unknown role names, permission
/// codes and user ids yield `false`.
pub trait AuthorizationRepository: Send + Sync {
    fn has_role(
        &self,
        user_id: Uuid,
        role_name: &str,
    ) -> impl Future<Output = BackofficeResult<bool>> + Send;
    fn has_permission(
        &self,
        user_id: Uuid,
        permission_code: &str,
    ) -> impl Future<Output = BackofficeResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession)
    -> impl Future<Output = BackofficeResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BackofficeResult<Session>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = BackofficeResult<Session>> + Send;
    /// Invalidate a single session.
    fn invalidate(&self, id: Uuid) -> impl Future<Output = BackofficeResult<()>> + Send;
    /// Invalidate all sessions for a user (e.g., on password change).
    fn invalidate_user_sessions(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = BackofficeResult<()>> + Send;
    /// Invalidate every session of the user except `keep`.
    fn invalidate_other_sessions(
        &self,
        user_id: Uuid,
        keep: Uuid,
    ) -> impl Future<Output = BackofficeResult<()>> + Send;
    /// Remove all expired sessions, returning how many were removed.
    fn cleanup_expired(&self) -> impl Future<Output = BackofficeResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Operation log (append-only)
// ---------------------------------------------------------------------------

/// Query filters for operation log entries.
#[derive(Debug, Clone, Default)]
pub struct OperationLogFilter {
    pub actor_id: Option<Uuid>,
    pub category: Option<LogCategory>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub trait OperationLogRepository: Send + Sync {
    /// Append a new entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateOperationLogEntry,
    ) -> impl Future<Output = BackofficeResult<OperationLogEntry>> + Send;
    /// Matching entries, newest first.
    fn list(
        &self,
        filter: OperationLogFilter,
    ) -> impl Future<Output = BackofficeResult<Vec<OperationLogEntry>>> + Send;
}
