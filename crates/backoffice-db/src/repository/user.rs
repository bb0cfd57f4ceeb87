//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use backoffice_core::error::{BackofficeError, BackofficeResult};
use backoffice_core::models::user::{CreateUser, UpdateUser, User};
use backoffice_core::repository::UserRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};
use crate::repository::support::{CountRow, total};

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    username: String,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    phone: Option<String>,
    department: Option<String>,
    position: Option<String>,
    about_me: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            display_name: self.display_name,
            phone: self.phone,
            department: self.department,
            position: self.position,
            about_me: self.about_me,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login_at: self.last_login_at,
        })
    }
}

const SELECT_USER_BY_ID: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('user', $id)";

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::PasswordHash(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    /// Reject `field = value` when another user (other than `exclude`)
    /// already holds it.
    async fn ensure_unique(
        &self,
        field: &'static str,
        value: &str,
        exclude: Option<Uuid>,
    ) -> BackofficeResult<()> {
        let query = format!(
            "SELECT count() AS total FROM user \
             WHERE {field} = $value AND meta::id(id) != $exclude GROUP ALL"
        );
        let mut result = self
            .db
            .query(query)
            .bind(("value", value.to_string()))
            .bind(("exclude", exclude.map(|id| id.to_string()).unwrap_or_default()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        if total(&rows) > 0 {
            return Err(BackofficeError::AlreadyExists {
                entity: format!("user with {field} '{value}'"),
            });
        }
        Ok(())
    }

    async fn fetch_one(
        &self,
        query: &str,
        key: &'static str,
        value: String,
    ) -> BackofficeResult<User> {
        let mut result = self
            .db
            .query(query)
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: if key == "id" {
                value
            } else {
                format!("{key}={value}")
            },
        })?;

        Ok(row.try_into_user()?)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> BackofficeResult<User> {
        self.ensure_unique("username", &input.username, None).await?;
        self.ensure_unique("email", &input.email, None).await?;

        let id_str = Uuid::new_v4().to_string();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 username = $username, email = $email, \
                 password_hash = $password_hash, \
                 display_name = $display_name, phone = $phone, \
                 department = $department, position = $position, \
                 about_me = NONE, is_active = true, \
                 last_login_at = NONE; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('user', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("display_name", input.display_name))
            .bind(("phone", input.phone))
            .bind(("department", input.department))
            .bind(("position", input.position))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        let user = row.try_into_user()?;
        debug!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> BackofficeResult<User> {
        self.fetch_one(SELECT_USER_BY_ID, "id", id.to_string()).await
    }

    async fn get_by_username(&self, username: &str) -> BackofficeResult<User> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE username = $username",
            "username",
            username.to_string(),
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> BackofficeResult<User> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE email = $email",
            "email",
            email.to_string(),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> BackofficeResult<User> {
        if let Some(username) = &input.username {
            self.ensure_unique("username", username, Some(id)).await?;
        }
        if let Some(email) = &input.email {
            self.ensure_unique("email", email, Some(id)).await?;
        }

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.username.is_some() {
            sets.push("username = $username");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.department.is_some() {
            sets.push("department = $department");
        }
        if input.position.is_some() {
            sets.push("position = $position");
        }
        if input.about_me.is_some() {
            sets.push("about_me = $about_me");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {sets}; {select};",
            sets = sets.join(", "),
            select = SELECT_USER_BY_ID,
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(username) = input.username {
            builder = builder.bind(("username", username));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        // Profile fields: Some(Some(v)) = set, Some(None) = clear.
        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(department) = input.department {
            builder = builder.bind(("department", department));
        }
        if let Some(position) = input.position {
            builder = builder.bind(("position", position));
        }
        if let Some(about_me) = input.about_me {
            builder = builder.bind(("about_me", about_me));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.try_into_user()?)
    }

    async fn set_password(&self, id: Uuid, password: &str) -> BackofficeResult<()> {
        self.get_by_id(id).await?;
        let password_hash = hash_password(password, self.pepper.as_deref())?;

        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 password_hash = $password_hash, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn record_login(&self, id: Uuid) -> BackofficeResult<()> {
        self.db
            .query("UPDATE type::record('user', $id) SET last_login_at = time::now()")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> BackofficeResult<()> {
        // Surface NotFound before touching anything.
        let user = self.get_by_id(id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE has_role WHERE in = type::record('user', $id); \
                 DELETE session WHERE user_id = $id; \
                 DELETE type::record('user', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(user_id = %id, username = %user.username, "User deleted");
        Ok(())
    }

    async fn list(&self) -> BackofficeResult<Vec<User>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user ORDER BY created_at ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
