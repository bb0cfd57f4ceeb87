//! SurrealDB implementation of [`AuthorizationRepository`].
//!
//! Each check is a single existence query over the membership edges.
//! Nothing is materialized in memory: the role name or permission code
//! is matched through the edge's `out` link inside the store.

use backoffice_core::error::BackofficeResult;
use backoffice_core::repository::AuthorizationRepository;
use surrealdb::{Connection, Surreal};
use tracing::trace;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::support::{CountRow, total};

/// `user -> has_role -> role` where `role.name` matches.
const HAS_ROLE: &str = "\
SELECT count() AS total FROM has_role \
WHERE in = type::record('user', $user_id) \
AND out.name = $role_name \
GROUP ALL";

/// `user -> has_role -> role -> grants -> permission` where
/// `permission.code` matches.
const HAS_PERMISSION: &str = "\
SELECT count() AS total FROM grants \
WHERE out.code = $permission_code \
AND in IN (\
    SELECT VALUE out FROM has_role \
    WHERE in = type::record('user', $user_id)\
) \
GROUP ALL";

/// SurrealDB implementation of the authorization evaluator.
#[derive(Clone)]
pub struct SurrealAuthorizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuthorizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn exists(
        &self,
        query: &'static str,
        user_id: Uuid,
        key: &'static str,
        value: &str,
    ) -> BackofficeResult<bool> {
        let mut result = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind((key, value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(total(&rows) > 0)
    }
}

impl<C: Connection> AuthorizationRepository for SurrealAuthorizationRepository<C> {
    async fn has_role(&self, user_id: Uuid, role_name: &str) -> BackofficeResult<bool> {
        let found = self
            .exists(HAS_ROLE, user_id, "role_name", role_name)
            .await?;
        trace!(user_id = %user_id, role_name, found, "has_role");
        Ok(found)
    }

    async fn has_permission(&self, user_id: Uuid, permission_code: &str) -> BackofficeResult<bool> {
        let found = self
            .exists(HAS_PERMISSION, user_id, "permission_code", permission_code)
            .await?;
        trace!(user_id = %user_id, permission_code, found, "has_permission");
        Ok(found)
    }
}
