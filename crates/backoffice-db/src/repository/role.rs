//! SurrealDB implementation of [`RoleRepository`].
//!
//! User memberships are `has_role` edges (`user -> has_role -> role`).

use backoffice_core::error::{BackofficeError, BackofficeResult};
use backoffice_core::models::role::{CreateRole, Role, UpdateRole};
use backoffice_core::repository::{Choice, RoleRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};
use crate::repository::support::{CountRow, dedup_ids, total};

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid(&self.record_id, "role")?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ChoiceRow {
    record_id: String,
    label: String,
}

impl ChoiceRow {
    fn try_into_choice(self) -> Result<Choice, DbError> {
        Ok(Choice {
            id: parse_uuid(&self.record_id, "role")?,
            label: self.label,
        })
    }
}

/// Raised by [`DELETE_UNREFERENCED_ROLE`] when the role still has members.
const ROLE_IN_USE: &str = "role_in_use";

/// One statement, hence one transaction: the membership re-check and the
/// deletes cannot be interleaved with a concurrent `set_user_roles`.
const DELETE_UNREFERENCED_ROLE: &str = "\
IF array::len((SELECT VALUE id FROM has_role WHERE out = type::record('role', $id))) > 0 { \
    THROW 'role_in_use' \
} ELSE { \
    DELETE grants WHERE in = type::record('role', $id); \
    DELETE type::record('role', $id); \
};";

fn into_roles(rows: Vec<RoleRow>) -> Result<Vec<Role>, DbError> {
    rows.into_iter().map(RoleRow::try_into_role).collect()
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn ensure_name_free(&self, name: &str, exclude: Option<Uuid>) -> BackofficeResult<()> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM role \
                 WHERE name = $name AND meta::id(id) != $exclude GROUP ALL",
            )
            .bind(("name", name.to_string()))
            .bind(("exclude", exclude.map(|id| id.to_string()).unwrap_or_default()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        if total(&rows) > 0 {
            return Err(BackofficeError::AlreadyExists {
                entity: format!("role '{name}'"),
            });
        }
        Ok(())
    }

    /// Delete the role and its grants unless a member appeared since the
    /// caller's count.
    async fn delete_unreferenced(&self, role: &Role) -> BackofficeResult<()> {
        let id_str = role.id.to_string();
        let response = self
            .db
            .query(DELETE_UNREFERENCED_ROLE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        match response.check() {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains(ROLE_IN_USE) => Err(BackofficeError::InUse {
                entity: format!("role '{}'", role.name),
                id: id_str,
                references: "user(s)".into(),
            }),
            Err(e) => Err(DbError::Query(e.to_string()).into()),
        }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> BackofficeResult<Role> {
        self.ensure_name_free(&input.name, None).await?;

        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('role', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.try_into_role()?)
    }

    async fn get_by_id(&self, id: Uuid) -> BackofficeResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.try_into_role()?)
    }

    async fn get_by_name(&self, name: &str) -> BackofficeResult<Role> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM role WHERE name = $name")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_role()?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> BackofficeResult<Role> {
        if let Some(name) = &input.name {
            self.ensure_name_free(name, Some(id)).await?;
        }

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('role', $id);",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.try_into_role()?)
    }

    async fn delete(&self, id: Uuid) -> BackofficeResult<()> {
        let role = self.get_by_id(id).await?;
        let id_str = id.to_string();

        let mut members = self
            .db
            .query(
                "SELECT count() AS total FROM has_role \
                 WHERE out = type::record('role', $id) GROUP ALL",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let member_rows: Vec<CountRow> = members.take(0).map_err(DbError::from)?;
        let member_count = total(&member_rows);
        if member_count > 0 {
            return Err(BackofficeError::InUse {
                entity: format!("role '{}'", role.name),
                id: id_str,
                references: format!("{member_count} user(s)"),
            });
        }

        // Grants belong to the role and go with it.
        self.delete_unreferenced(&role).await?;

        debug!(role_id = %id, name = %role.name, "Role deleted");
        Ok(())
    }

    async fn list(&self) -> BackofficeResult<Vec<Role>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM role ORDER BY created_at ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;

        Ok(into_roles(rows)?)
    }

    async fn choices(&self) -> BackofficeResult<Vec<Choice>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, name AS label FROM role ORDER BY label ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChoiceRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(ChoiceRow::try_into_choice)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn get_user_roles(&self, user_id: Uuid) -> BackofficeResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE id IN (\
                     SELECT VALUE out FROM has_role \
                     WHERE in = type::record('user', $user_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;

        Ok(into_roles(rows)?)
    }

    async fn set_user_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> BackofficeResult<()> {
        let user_id_str = user_id.to_string();

        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE id = type::record('user', $user_id) GROUP ALL",
            )
            .bind(("user_id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let user_rows: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if total(&user_rows) == 0 {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: user_id_str,
            }
            .into());
        }

        let role_keys = dedup_ids(role_ids);
        let requested = role_keys.len();

        // Replace in one transaction: readers never observe the empty
        // intermediate set. Unknown role ids simply match no record.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $user = type::record('user', $user_id); \
                 DELETE has_role WHERE in = $user; \
                 FOR $role IN (SELECT VALUE id FROM role WHERE meta::id(id) IN $role_ids) { \
                     RELATE $user->has_role->$role; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user_id", user_id_str))
            .bind(("role_ids", role_keys))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        info!(user_id = %user_id, requested, "User roles replaced");
        Ok(())
    }
}
