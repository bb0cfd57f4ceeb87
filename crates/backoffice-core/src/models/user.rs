//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    /// Free-text department label; not a reference into a department tree.
    pub department: Option<String>,
    /// Free-text position label.
    pub position: Option<String>,
    pub about_me: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
}

/// Partial update. Profile fields use `Some(Some(v))` = set,
/// `Some(None)` = clear, `None` = no change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub department: Option<Option<String>>,
    pub position: Option<Option<String>>,
    pub about_me: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Self-service profile edit. Same `Option<Option<_>>` convention as
/// [`UpdateUser`]; username and activation stay administrator-only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProfile {
    pub email: Option<String>,
    pub display_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub department: Option<Option<String>>,
    pub position: Option<Option<String>>,
    pub about_me: Option<Option<String>>,
}

impl From<UpdateProfile> for UpdateUser {
    fn from(profile: UpdateProfile) -> Self {
        Self {
            username: None,
            email: profile.email,
            display_name: profile.display_name,
            phone: profile.phone,
            department: profile.department,
            position: profile.position,
            about_me: profile.about_me,
            is_active: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_never_touches_username_or_activation() {
        let update = UpdateUser::from(UpdateProfile {
            email: Some("new@example.com".into()),
            about_me: Some(None),
            ..Default::default()
        });
        assert!(update.username.is_none());
        assert!(update.is_active.is_none());
        assert_eq!(update.email.as_deref(), Some("new@example.com"));
        assert_eq!(update.about_me, Some(None));
    }
}
