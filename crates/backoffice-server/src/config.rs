//! Server configuration sourced from `BACKOFFICE_*` environment variables.

use anyhow::{Context, Result, bail};
use backoffice_auth::AuthConfig;
use backoffice_auth::config::MAX_SESSION_LIFETIME_SECS;
use backoffice_db::DbConfig;

/// Credentials for the administrator created on first start.
#[derive(Debug, Clone)]
pub struct InitialAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    /// Set only when `BACKOFFICE_ADMIN_USERNAME` is present.
    pub initial_admin: Option<InitialAdmin>,
    /// Period of the expired-session sweep.
    pub session_sweep_interval_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_defaults = DbConfig::default();
        let db = DbConfig {
            endpoint: lookup("BACKOFFICE_DB_ENDPOINT").unwrap_or(db_defaults.endpoint),
            namespace: lookup("BACKOFFICE_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: lookup("BACKOFFICE_DB_DATABASE").unwrap_or(db_defaults.database),
            username: lookup("BACKOFFICE_DB_USERNAME").unwrap_or(db_defaults.username),
            password: lookup("BACKOFFICE_DB_PASSWORD").unwrap_or(db_defaults.password),
        };

        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            session_lifetime_secs: parse_lifetime(
                &lookup,
                "BACKOFFICE_SESSION_LIFETIME_SECS",
                auth_defaults.session_lifetime_secs,
            )?,
            remember_me_lifetime_secs: parse_lifetime(
                &lookup,
                "BACKOFFICE_REMEMBER_ME_LIFETIME_SECS",
                auth_defaults.remember_me_lifetime_secs,
            )?,
            pepper: lookup("BACKOFFICE_PASSWORD_PEPPER").filter(|p| !p.is_empty()),
            min_password_length: parse_or(
                &lookup,
                "BACKOFFICE_MIN_PASSWORD_LENGTH",
                auth_defaults.min_password_length,
            )?,
            default_role_name: match lookup("BACKOFFICE_DEFAULT_ROLE") {
                Some(name) if name.is_empty() => None,
                Some(name) => Some(name),
                None => auth_defaults.default_role_name,
            },
        };

        let initial_admin = match lookup("BACKOFFICE_ADMIN_USERNAME") {
            Some(username) => {
                let Some(password) = lookup("BACKOFFICE_ADMIN_PASSWORD") else {
                    bail!("BACKOFFICE_ADMIN_PASSWORD is required with BACKOFFICE_ADMIN_USERNAME");
                };
                let email = lookup("BACKOFFICE_ADMIN_EMAIL")
                    .unwrap_or_else(|| format!("{username}@localhost"));
                Some(InitialAdmin {
                    username,
                    email,
                    password,
                })
            }
            None => None,
        };

        let session_sweep_interval_secs =
            parse_or(&lookup, "BACKOFFICE_SESSION_SWEEP_SECS", 300)?;

        Ok(Self {
            db,
            auth,
            initial_admin,
            session_sweep_interval_secs,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.parse().with_context(|| format!("parse {key}")),
        None => Ok(default),
    }
}

fn parse_lifetime<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default)?;
    if secs > MAX_SESSION_LIFETIME_SECS {
        bail!("{key} must be at most {MAX_SESSION_LIFETIME_SECS} seconds, got {secs}");
    }
    Ok(secs)
}
