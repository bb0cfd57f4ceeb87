//! SurrealDB implementation of [`OperationLogRepository`].
//!
//! The `operation_log` table only permits create and select; there is no
//! way to edit history through this repository.

use backoffice_core::error::BackofficeResult;
use backoffice_core::models::operation_log::{
    CreateOperationLogEntry, LogCategory, LogLevel, OperationLogEntry,
};
use backoffice_core::repository::{OperationLogFilter, OperationLogRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct OperationLogRow {
    record_id: String,
    actor_id: Option<String>,
    category: String,
    level: String,
    operation: String,
    details: String,
    ip_address: Option<String>,
    timestamp: DateTime<Utc>,
}

fn parse_category(value: &str) -> Result<LogCategory, DbError> {
    match value {
        "Auth" => Ok(LogCategory::Auth),
        "User" => Ok(LogCategory::User),
        "Role" => Ok(LogCategory::Role),
        "Permission" => Ok(LogCategory::Permission),
        "System" => Ok(LogCategory::System),
        other => Err(DbError::InvalidRecord(format!(
            "unknown log category: {other}"
        ))),
    }
}

fn parse_level(value: &str) -> Result<LogLevel, DbError> {
    match value {
        "Info" => Ok(LogLevel::Info),
        "Warning" => Ok(LogLevel::Warning),
        "Error" => Ok(LogLevel::Error),
        other => Err(DbError::InvalidRecord(format!("unknown log level: {other}"))),
    }
}

impl OperationLogRow {
    fn try_into_entry(self) -> Result<OperationLogEntry, DbError> {
        Ok(OperationLogEntry {
            id: parse_uuid(&self.record_id, "operation_log")?,
            actor_id: self
                .actor_id
                .as_deref()
                .map(|id| parse_uuid(id, "actor"))
                .transpose()?,
            category: parse_category(&self.category)?,
            level: parse_level(&self.level)?,
            operation: self.operation,
            details: self.details,
            ip_address: self.ip_address,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the operation log.
#[derive(Clone)]
pub struct SurrealOperationLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOperationLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OperationLogRepository for SurrealOperationLogRepository<C> {
    async fn append(&self, input: CreateOperationLogEntry) -> BackofficeResult<OperationLogEntry> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('operation_log', $id) SET \
                 actor_id = $actor_id, category = $category, \
                 level = $level, operation = $operation, \
                 details = $details, ip_address = $ip_address; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('operation_log', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", input.actor_id.map(|id| id.to_string())))
            .bind(("category", input.category.as_str()))
            .bind(("level", input.level.as_str()))
            .bind(("operation", input.operation))
            .bind(("details", input.details))
            .bind(("ip_address", input.ip_address))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<OperationLogRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "operation_log".into(),
            id: id_str,
        })?;

        Ok(row.try_into_entry()?)
    }

    async fn list(&self, filter: OperationLogFilter) -> BackofficeResult<Vec<OperationLogEntry>> {
        let mut conditions = Vec::new();
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.category.is_some() {
            conditions.push("category = $category");
        }
        if filter.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if filter.to.is_some() {
            conditions.push("timestamp <= $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM operation_log {where_clause} \
             ORDER BY timestamp DESC"
        );

        let mut builder = self.db.query(&query);

        if let Some(actor_id) = filter.actor_id {
            builder = builder.bind(("actor_id", actor_id.to_string()));
        }
        if let Some(category) = filter.category {
            builder = builder.bind(("category", category.as_str()));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let rows: Vec<OperationLogRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(OperationLogRow::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
