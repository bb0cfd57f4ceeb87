//! Database-specific error types and conversions.

use backoffice_core::error::BackofficeError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A statement inside a query batch failed (constraint violation,
    /// cancelled transaction, ...).
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored row could not be mapped back to a domain type.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for BackofficeError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BackofficeError::NotFound { entity, id },
            DbError::PasswordHash(msg) => BackofficeError::Crypto(msg),
            other => {
                let message = other.to_string();
                match violated_unique_index(&message) {
                    Some(index) => BackofficeError::AlreadyExists {
                        entity: format!("record in unique index {index}"),
                    },
                    None => BackofficeError::Database(message),
                }
            }
        }
    }
}

/// Name of the unique index a failed write collided with, if any.
///
/// Writes that slip past a uniqueness pre-check are stopped by the index;
/// SurrealDB reports them as "Database index `name` already contains ...".
fn violated_unique_index(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("index `")?;
    let (index, tail) = rest.split_once('`')?;
    tail.trim_start()
        .starts_with("already contains")
        .then_some(index)
}

/// Parse a stored UUID string, naming the field on failure.
pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| DbError::InvalidRecord(format!("invalid {field} UUID: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb::Surreal;
    use surrealdb::engine::local::Mem;

    #[test]
    fn unrelated_query_errors_stay_database_errors() {
        let err = BackofficeError::from(DbError::Query("Parse error".into()));
        assert!(matches!(err, BackofficeError::Database(_)));
    }

    #[tokio::test]
    async fn unique_index_violation_maps_to_already_exists() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        db.query(
            "DEFINE TABLE tag SCHEMALESS; \
             DEFINE INDEX idx_tag_name ON TABLE tag COLUMNS name UNIQUE; \
             CREATE tag SET name = 'red';",
        )
        .await
        .unwrap()
        .check()
        .unwrap();

        let failure = db
            .query("CREATE tag SET name = 'red'")
            .await
            .unwrap()
            .check()
            .map_err(|e| DbError::Query(e.to_string()))
            .unwrap_err();

        match BackofficeError::from(failure) {
            BackofficeError::AlreadyExists { entity } => {
                assert!(entity.contains("idx_tag_name"));
            }
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }
}
