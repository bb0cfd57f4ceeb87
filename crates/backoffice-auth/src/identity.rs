//! The authenticated caller.

use backoffice_core::models::user::User;
use uuid::Uuid;

/// A user whose identity has been proven by a password login or a live
/// session.
///
/// Can only be built inside this crate, so holding one means the user
/// record existed and was active when it was resolved. Authorization
/// checks and administrative operations take it instead of a bare id.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user: User,
    session_id: Uuid,
    ip_address: Option<String>,
}

impl AuthenticatedUser {
    pub(crate) fn new(user: User, session_id: Uuid, ip_address: Option<String>) -> Self {
        Self {
            user,
            session_id,
            ip_address,
        }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    /// The session this identity was resolved from.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Client address recorded on the session, used for log entries.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }
}
