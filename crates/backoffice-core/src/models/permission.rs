//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Human-readable label shown in management screens.
    pub name: String,
    /// Globally unique capability code checked by the evaluator
    /// (e.g., `manage_users`).
    pub code: String,
    /// Module label used for grouping (e.g., `system`, `finance`).
    pub module: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub code: String,
    pub module: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub code: Option<String>,
    pub module: Option<String>,
    pub description: Option<String>,
}
