//! SurrealDB implementation of [`PermissionRepository`].
//!
//! Grants are `grants` edges (`role -> grants -> permission`).

use std::collections::BTreeMap;

use backoffice_core::error::{BackofficeError, BackofficeResult};
use backoffice_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use backoffice_core::repository::{Choice, PermissionRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};
use crate::repository::support::{CountRow, dedup_ids, total};

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    record_id: String,
    name: String,
    code: String,
    module: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRow {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid(&self.record_id, "permission")?,
            name: self.name,
            code: self.code,
            module: self.module,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_permissions(rows: Vec<PermissionRow>) -> Result<Vec<Permission>, DbError> {
    rows.into_iter()
        .map(PermissionRow::try_into_permission)
        .collect()
}

/// Raised by [`DELETE_UNGRANTED_PERMISSION`] when a role still grants it.
const PERMISSION_IN_USE: &str = "permission_in_use";

/// Grant re-check and delete in a single statement, so a concurrent
/// `set_role_permissions` cannot slip in between.
const DELETE_UNGRANTED_PERMISSION: &str = "\
IF array::len((SELECT VALUE id FROM grants WHERE out = type::record('permission', $id))) > 0 { \
    THROW 'permission_in_use' \
} ELSE { \
    DELETE type::record('permission', $id); \
};";

#[derive(Debug, SurrealValue)]
struct ChoiceRow {
    record_id: String,
    label: String,
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn ensure_code_free(&self, code: &str, exclude: Option<Uuid>) -> BackofficeResult<()> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM permission \
                 WHERE code = $code AND meta::id(id) != $exclude GROUP ALL",
            )
            .bind(("code", code.to_string()))
            .bind(("exclude", exclude.map(|id| id.to_string()).unwrap_or_default()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        if total(&rows) > 0 {
            return Err(BackofficeError::AlreadyExists {
                entity: format!("permission '{code}'"),
            });
        }
        Ok(())
    }

    async fn fetch_one(
        &self,
        query: &str,
        key: &'static str,
        value: String,
    ) -> BackofficeResult<Permission> {
        let mut result = self
            .db
            .query(query)
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: value,
        })?;

        Ok(row.try_into_permission()?)
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> BackofficeResult<Permission> {
        self.ensure_code_free(&input.code, None).await?;

        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, code = $code, module = $module, \
                 description = $description; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('permission', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("code", input.code))
            .bind(("module", input.module))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission()?)
    }

    async fn get_by_id(&self, id: Uuid) -> BackofficeResult<Permission> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM type::record('permission', $id)",
            "id",
            id.to_string(),
        )
        .await
    }

    async fn get_by_code(&self, code: &str) -> BackofficeResult<Permission> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM permission WHERE code = $code",
            "code",
            code.to_string(),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdatePermission) -> BackofficeResult<Permission> {
        if let Some(code) = &input.code {
            self.ensure_code_free(code, Some(id)).await?;
        }

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.code.is_some() {
            sets.push("code = $code");
        }
        if input.module.is_some() {
            sets.push("module = $module");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('permission', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('permission', $id);",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(code) = input.code {
            builder = builder.bind(("code", code));
        }
        if let Some(module) = input.module {
            builder = builder.bind(("module", module));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission()?)
    }

    async fn delete(&self, id: Uuid) -> BackofficeResult<()> {
        let permission = self.get_by_id(id).await?;
        let id_str = id.to_string();

        let mut grants = self
            .db
            .query(
                "SELECT count() AS total FROM grants \
                 WHERE out = type::record('permission', $id) GROUP ALL",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let grant_rows: Vec<CountRow> = grants.take(0).map_err(DbError::from)?;
        let grant_count = total(&grant_rows);
        if grant_count > 0 {
            return Err(BackofficeError::InUse {
                entity: format!("permission '{}'", permission.code),
                id: id_str,
                references: format!("{grant_count} role(s)"),
            });
        }

        let response = self
            .db
            .query(DELETE_UNGRANTED_PERMISSION)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        if let Err(e) = response.check() {
            let message = e.to_string();
            if message.contains(PERMISSION_IN_USE) {
                return Err(BackofficeError::InUse {
                    entity: format!("permission '{}'", permission.code),
                    id: id_str,
                    references: "role(s)".into(),
                });
            }
            return Err(DbError::Query(message).into());
        }

        debug!(permission_id = %id, code = %permission.code, "Permission deleted");
        Ok(())
    }

    async fn list(&self) -> BackofficeResult<Vec<Permission>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM permission ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;

        Ok(into_permissions(rows)?)
    }

    async fn list_by_module(&self) -> BackofficeResult<BTreeMap<String, Vec<Permission>>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 ORDER BY module ASC, code ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;

        let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
        for permission in into_permissions(rows)? {
            grouped
                .entry(permission.module.clone())
                .or_default()
                .push(permission);
        }
        Ok(grouped)
    }

    async fn choices(&self) -> BackofficeResult<Vec<Choice>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, name AS label FROM permission \
                 ORDER BY label ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChoiceRow> = result.take(0).map_err(DbError::from)?;

        let choices = rows
            .into_iter()
            .map(|row| {
                Ok(Choice {
                    id: parse_uuid(&row.record_id, "permission")?,
                    label: row.label,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(choices)
    }

    async fn get_role_permissions(&self, role_id: Uuid) -> BackofficeResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) \
                 ORDER BY code ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;

        Ok(into_permissions(rows)?)
    }

    async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> BackofficeResult<()> {
        let role_id_str = role_id.to_string();

        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM role \
                 WHERE id = type::record('role', $role_id) GROUP ALL",
            )
            .bind(("role_id", role_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let role_rows: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if total(&role_rows) == 0 {
            return Err(DbError::NotFound {
                entity: "role".into(),
                id: role_id_str,
            }
            .into());
        }

        let permission_keys = dedup_ids(permission_ids);
        let requested = permission_keys.len();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $role = type::record('role', $role_id); \
                 DELETE grants WHERE in = $role; \
                 FOR $permission IN (\
                     SELECT VALUE id FROM permission WHERE meta::id(id) IN $permission_ids\
                 ) { \
                     RELATE $role->grants->$permission; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("role_id", role_id_str))
            .bind(("permission_ids", permission_keys))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        info!(role_id = %role_id, requested, "Role permissions replaced");
        Ok(())
    }
}
