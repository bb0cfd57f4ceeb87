//! Authentication service: login, session resolution, logout,
//! self-registration and self-service account changes.

use backoffice_core::error::{BackofficeError, BackofficeResult};
use backoffice_core::models::operation_log::{CreateOperationLogEntry, LogCategory, LogLevel};
use backoffice_core::models::session::CreateSession;
use backoffice_core::models::user::{CreateUser, UpdateProfile, User};
use backoffice_core::repository::{
    OperationLogRepository, RoleRepository, SessionRepository, UserRepository,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::AuthenticatedUser;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
    /// Use the longer "remember me" session lifetime.
    pub remember: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Raw opaque session token (return to client, not stored).
    pub session_token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub user: AuthenticatedUser,
}

/// Input for self-registration.
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, S, R, L>
where
    U: UserRepository,
    S: SessionRepository,
    R: RoleRepository,
    L: OperationLogRepository,
{
    user_repo: U,
    session_repo: S,
    role_repo: R,
    log_repo: L,
    config: AuthConfig,
}

impl<U, S, R, L> AuthService<U, S, R, L>
where
    U: UserRepository,
    S: SessionRepository,
    R: RoleRepository,
    L: OperationLogRepository,
{
    pub fn new(user_repo: U, session_repo: S, role_repo: R, log_repo: L, config: AuthConfig) -> Self {
        Self {
            user_repo,
            session_repo,
            role_repo,
            log_repo,
            config,
        }
    }

    /// Look up by username first, then by email. Unknown accounts are
    /// reported exactly like a wrong password.
    async fn find_login_user(&self, username_or_email: &str) -> BackofficeResult<User> {
        match self.user_repo.get_by_username(username_or_email).await {
            Ok(user) => Ok(user),
            Err(BackofficeError::NotFound { .. }) => self
                .user_repo
                .get_by_email(username_or_email)
                .await
                .map_err(|e| match e {
                    BackofficeError::NotFound { .. } => AuthError::InvalidCredentials.into(),
                    other => other,
                }),
            Err(e) => Err(e),
        }
    }

    /// Authenticate with username/email + password and open a session.
    pub async fn login(&self, input: LoginInput) -> BackofficeResult<LoginOutput> {
        let user = self.find_login_user(&input.username_or_email).await?;

        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;

        if !valid {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            self.log_repo
                .append(CreateOperationLogEntry {
                    level: LogLevel::Warning,
                    ip_address: input.ip_address.clone(),
                    ..CreateOperationLogEntry::info(
                        Some(user.id),
                        LogCategory::Auth,
                        "login_failed",
                        format!("failed login for {}", user.username),
                    )
                })
                .await?;
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        let expires_at = self
            .config
            .session_lifetime(input.remember)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                BackofficeError::Internal("session lifetime out of range".into())
            })?;
        let raw_token = token::generate_session_token();

        let session = self
            .session_repo
            .create(CreateSession {
                user_id: user.id,
                token_hash: token::hash_session_token(&raw_token),
                ip_address: input.ip_address.clone(),
                user_agent: input.user_agent,
                remember: input.remember,
                expires_at,
            })
            .await?;

        self.user_repo.record_login(user.id).await?;
        self.log_repo
            .append(CreateOperationLogEntry {
                ip_address: input.ip_address.clone(),
                ..CreateOperationLogEntry::info(
                    Some(user.id),
                    LogCategory::Auth,
                    "login",
                    format!("{} logged in", user.username),
                )
            })
            .await?;

        info!(user_id = %user.id, session_id = %session.id, remember = input.remember, "User logged in");

        Ok(LoginOutput {
            session_token: raw_token,
            session_id: session.id,
            expires_at,
            user: AuthenticatedUser::new(user, session.id, input.ip_address),
        })
    }

    /// Resolve a raw session token to the user it belongs to.
    ///
    /// Expired sessions are deleted on sight. The user is reloaded on
    /// every call so deactivation takes effect immediately.
    pub async fn authenticate(&self, raw_token: &str) -> BackofficeResult<AuthenticatedUser> {
        let token_hash = token::hash_session_token(raw_token);
        let session = self
            .session_repo
            .get_by_token_hash(&token_hash)
            .await
            .map_err(|e| match e {
                BackofficeError::NotFound { .. } => AuthError::SessionInvalid.into(),
                other => other,
            })?;

        if session.expires_at <= Utc::now() {
            self.session_repo.invalidate(session.id).await?;
            debug!(session_id = %session.id, "Expired session removed");
            return Err(AuthError::SessionExpired.into());
        }

        let user = match self.user_repo.get_by_id(session.user_id).await {
            Ok(user) => user,
            Err(BackofficeError::NotFound { .. }) => {
                self.session_repo.invalidate(session.id).await?;
                return Err(AuthError::SessionInvalid.into());
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        Ok(AuthenticatedUser::new(user, session.id, session.ip_address))
    }

    /// Invalidate a single session.
    pub async fn logout(&self, session_id: Uuid) -> BackofficeResult<()> {
        self.session_repo.invalidate(session_id).await?;
        debug!(session_id = %session_id, "Session closed");
        Ok(())
    }

    /// Revoke all sessions for a user (e.g. on password change).
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> BackofficeResult<()> {
        self.session_repo.invalidate_user_sessions(user_id).await
    }

    /// Change the caller's own password.
    ///
    /// The current password must verify against the stored hash. Every
    /// other session of the user is closed; the calling session stays.
    pub async fn change_password(
        &self,
        actor: &AuthenticatedUser,
        current_password: &str,
        new_password: &str,
    ) -> BackofficeResult<()> {
        // Reload: the hash may have changed since the session was resolved.
        let user = self.user_repo.get_by_id(actor.id()).await?;

        let valid = password::verify_password(
            current_password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(user_id = %user.id, "Password change rejected: wrong current password");
            return Err(AuthError::InvalidCredentials.into());
        }
        password::check_policy(new_password, self.config.min_password_length)?;

        self.user_repo.set_password(user.id, new_password).await?;
        self.session_repo
            .invalidate_other_sessions(user.id, actor.session_id())
            .await?;
        self.log_repo
            .append(CreateOperationLogEntry {
                ip_address: actor.ip_address().map(str::to_string),
                ..CreateOperationLogEntry::info(
                    Some(user.id),
                    LogCategory::Auth,
                    "change_password",
                    format!("{} changed their password", user.username),
                )
            })
            .await?;

        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Edit the caller's own profile. A taken email yields `AlreadyExists`.
    pub async fn update_profile(
        &self,
        actor: &AuthenticatedUser,
        input: UpdateProfile,
    ) -> BackofficeResult<User> {
        let user = self.user_repo.update(actor.id(), input.into()).await?;
        self.log_repo
            .append(CreateOperationLogEntry {
                ip_address: actor.ip_address().map(str::to_string),
                ..CreateOperationLogEntry::info(
                    Some(user.id),
                    LogCategory::User,
                    "update_profile",
                    format!("{} updated their profile", user.username),
                )
            })
            .await?;

        debug!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Create an account and assign the configured default role.
    ///
    /// A missing default role is not an error: the account is created
    /// without roles.
    pub async fn register(&self, input: RegisterInput) -> BackofficeResult<User> {
        password::check_policy(&input.password, self.config.min_password_length)?;

        let user = self
            .user_repo
            .create(CreateUser {
                username: input.username,
                email: input.email,
                password: input.password,
                display_name: input.display_name,
                ..Default::default()
            })
            .await?;

        if let Some(role_name) = &self.config.default_role_name {
            match self.role_repo.get_by_name(role_name).await {
                Ok(role) => self.role_repo.set_user_roles(user.id, &[role.id]).await?,
                Err(BackofficeError::NotFound { .. }) => {
                    warn!(role = %role_name, "Default role missing, user registered without roles");
                }
                Err(e) => return Err(e),
            }
        }

        self.log_repo
            .append(CreateOperationLogEntry::info(
                Some(user.id),
                LogCategory::Auth,
                "register",
                format!("{} registered", user.username),
            ))
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }
}
