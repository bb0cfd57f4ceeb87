//! Default permission and role seeding.
//!
//! Runs once against an empty permission table: five `system` permissions,
//! an `admin` role holding all of them and a `user` role holding
//! `view_system`. Log access (`view_logs`) stays admin-only. Everything is
//! written in a single transaction so a failed seed leaves no partial
//! authorization state behind.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::support::{CountRow, total};

/// Name of the seeded role holding every default permission.
pub const DEFAULT_ADMIN_ROLE: &str = "admin";

/// Name of the seeded role holding only `view_system`.
pub const DEFAULT_USER_ROLE: &str = "user";

const SYSTEM_MODULE: &str = "system";

/// `(code, name, description)` of each default permission.
const DEFAULT_PERMISSIONS: &[(&str, &str, &str)] = &[
    ("view_system", "View system", "View basic system information"),
    ("manage_users", "Manage users", "Manage system users"),
    ("manage_roles", "Manage roles", "Manage system roles"),
    ("manage_permissions", "Manage permissions", "Manage system permissions"),
    ("view_logs", "View logs", "Read the login and operation logs"),
];

/// Granted to [`DEFAULT_USER_ROLE`].
const USER_ROLE_PERMISSION: &str = "view_system";

/// Outcome of [`seed_defaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    /// `false` when permissions already existed and nothing was written.
    pub seeded: bool,
    pub permissions: usize,
    pub roles: usize,
}

#[derive(Debug, SurrealValue)]
struct SeedPermission {
    id: String,
    name: String,
    code: String,
    module: String,
    description: String,
}

/// Seed default permissions and roles if the permission table is empty.
///
/// Idempotent: any existing permission means the store has already been
/// set up (or curated by an administrator), so nothing is touched.
pub async fn seed_defaults<C: Connection>(db: &Surreal<C>) -> Result<SeedReport, DbError> {
    let mut existing = db
        .query("SELECT count() AS total FROM permission GROUP ALL")
        .await?;
    let rows: Vec<CountRow> = existing.take(0)?;
    if total(&rows) > 0 {
        debug!("Permissions present, skipping default seed");
        return Ok(SeedReport {
            seeded: false,
            permissions: 0,
            roles: 0,
        });
    }

    let permissions: Vec<SeedPermission> = DEFAULT_PERMISSIONS
        .iter()
        .map(|(code, name, description)| SeedPermission {
            id: Uuid::new_v4().to_string(),
            name: (*name).to_string(),
            code: (*code).to_string(),
            module: SYSTEM_MODULE.to_string(),
            description: (*description).to_string(),
        })
        .collect();
    let permission_count = permissions.len();

    db.query(
        "BEGIN TRANSACTION; \
         FOR $p IN $permissions { \
             CREATE type::record('permission', $p.id) SET \
                 name = $p.name, code = $p.code, \
                 module = $p.module, description = $p.description; \
         }; \
         CREATE type::record('role', $admin_id) SET \
             name = $admin_name, description = 'System administrator'; \
         CREATE type::record('role', $user_id) SET \
             name = $user_name, description = 'Regular user'; \
         LET $admin = type::record('role', $admin_id); \
         FOR $permission IN (SELECT VALUE id FROM permission) { \
             RELATE $admin->grants->$permission; \
         }; \
         LET $regular = type::record('role', $user_id); \
         FOR $permission IN (SELECT VALUE id FROM permission WHERE code = $user_code) { \
             RELATE $regular->grants->$permission; \
         }; \
         CREATE type::record('operation_log', $log_id) SET \
             category = 'System', level = 'Info', \
             operation = 'seed_defaults', \
             details = 'Seeded default permissions and roles'; \
         COMMIT TRANSACTION;",
    )
    .bind(("permissions", permissions))
    .bind(("admin_id", Uuid::new_v4().to_string()))
    .bind(("admin_name", DEFAULT_ADMIN_ROLE))
    .bind(("user_id", Uuid::new_v4().to_string()))
    .bind(("user_name", DEFAULT_USER_ROLE))
    .bind(("user_code", USER_ROLE_PERMISSION))
    .bind(("log_id", Uuid::new_v4().to_string()))
    .await?
    .check()
    .map_err(|e| DbError::Query(format!("default seed failed: {e}")))?;

    info!(
        permissions = permission_count,
        roles = 2,
        "Seeded default permissions and roles"
    );

    Ok(SeedReport {
        seeded: true,
        permissions: permission_count,
        roles: 2,
    })
}
