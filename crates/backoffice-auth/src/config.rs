//! Authentication configuration.

use chrono::TimeDelta;

/// Upper bound accepted for either session lifetime (ten years).
pub const MAX_SESSION_LIFETIME_SECS: u64 = 10 * 365 * 86_400;

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default: 86_400 = 1 day).
    pub session_lifetime_secs: u64,
    /// Session lifetime when "remember me" is requested
    /// (default: 2_592_000 = 30 days).
    pub remember_me_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id verification.
    /// Must match the pepper given to the user repository.
    pub pepper: Option<String>,
    /// Minimum password length for registration and password resets.
    pub min_password_length: usize,
    /// Role assigned to self-registered users, if it exists.
    pub default_role_name: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime_secs: 86_400,
            remember_me_lifetime_secs: 2_592_000,
            pepper: None,
            min_password_length: 8,
            default_role_name: Some("user".into()),
        }
    }
}

impl AuthConfig {
    /// Lifetime for a new session, honouring "remember me".
    ///
    /// `None` when the configured value does not fit a [`TimeDelta`].
    pub fn session_lifetime(&self, remember: bool) -> Option<TimeDelta> {
        let secs = if remember {
            self.remember_me_lifetime_secs
        } else {
            self.session_lifetime_secs
        };
        i64::try_from(secs).ok().and_then(TimeDelta::try_seconds)
    }
}
