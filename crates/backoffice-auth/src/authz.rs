//! Role and permission gates for authenticated callers.

use backoffice_core::error::{BackofficeError, BackofficeResult};
use backoffice_core::repository::AuthorizationRepository;
use tracing::debug;

use crate::identity::AuthenticatedUser;

/// Answers "does this caller hold role / permission X?".
///
/// Each check is a single store query; nothing is cached, so a change
/// to memberships or grants is visible to the very next check.
#[derive(Clone)]
pub struct Authorizer<A: AuthorizationRepository> {
    repo: A,
}

impl<A: AuthorizationRepository> Authorizer<A> {
    pub fn new(repo: A) -> Self {
        Self { repo }
    }

    /// `true` iff the caller holds a role with exactly this name.
    pub async fn has_role(&self, user: &AuthenticatedUser, role_name: &str) -> BackofficeResult<bool> {
        self.repo.has_role(user.id(), role_name).await
    }

    /// `true` iff any role held by the caller grants this permission code.
    pub async fn has_permission(
        &self,
        user: &AuthenticatedUser,
        permission_code: &str,
    ) -> BackofficeResult<bool> {
        self.repo.has_permission(user.id(), permission_code).await
    }

    pub async fn require_role(&self, user: &AuthenticatedUser, role_name: &str) -> BackofficeResult<()> {
        if self.has_role(user, role_name).await? {
            return Ok(());
        }
        debug!(user_id = %user.id(), role_name, "Role check denied");
        Err(BackofficeError::AuthorizationDenied {
            reason: format!("role '{role_name}' required"),
        })
    }

    pub async fn require_permission(
        &self,
        user: &AuthenticatedUser,
        permission_code: &str,
    ) -> BackofficeResult<()> {
        if self.has_permission(user, permission_code).await? {
            return Ok(());
        }
        debug!(user_id = %user.id(), permission_code, "Permission check denied");
        Err(BackofficeError::AuthorizationDenied {
            reason: format!("permission '{permission_code}' required"),
        })
    }
}
