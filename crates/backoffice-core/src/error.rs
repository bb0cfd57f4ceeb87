//! Error types for the back-office system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackofficeError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// The entity is still referenced by memberships and cannot be removed.
    #[error("Entity still in use: {entity} {id} is referenced by {references}")]
    InUse {
        entity: String,
        id: String,
        references: String,
    },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BackofficeResult<T> = Result<T, BackofficeError>;
