//! Operation log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogCategory {
    Auth,
    User,
    Role,
    Permission,
    System,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Auth => "Auth",
            LogCategory::User => "User",
            LogCategory::Role => "Role",
            LogCategory::Permission => "Permission",
            LogCategory::System => "System",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLogEntry {
    pub id: Uuid,
    /// `None` for entries written by the system itself (e.g., seeding).
    pub actor_id: Option<Uuid>,
    pub category: LogCategory,
    pub level: LogLevel,
    pub operation: String,
    pub details: String,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOperationLogEntry {
    pub actor_id: Option<Uuid>,
    pub category: LogCategory,
    pub level: LogLevel,
    pub operation: String,
    pub details: String,
    pub ip_address: Option<String>,
}

impl CreateOperationLogEntry {
    /// An `Info` entry attributed to `actor_id`.
    pub fn info(
        actor_id: Option<Uuid>,
        category: LogCategory,
        operation: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            category,
            level: LogLevel::Info,
            operation: operation.into(),
            details: details.into(),
            ip_address: None,
        }
    }
}
