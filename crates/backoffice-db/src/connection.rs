//! Opening the backing store.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;
use crate::seed::{SeedReport, seed_defaults};

/// Where the store lives and how to sign in to it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Engine endpoint: `ws://127.0.0.1:8000` for a server, or an embedded
    /// engine such as `mem://` when the crate is built with its feature.
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials, used for network endpoints only.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000".into(),
            namespace: "backoffice".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    fn is_remote(&self) -> bool {
        ["ws://", "wss://", "http://", "https://"]
            .iter()
            .any(|scheme| self.endpoint.starts_with(scheme))
    }
}

/// Connect, select namespace and database, then migrate and seed.
///
/// Safe on every start: migrations and seeding skip work already done.
pub async fn open(config: &DbConfig) -> Result<(Surreal<Any>, SeedReport), DbError> {
    info!(
        endpoint = %config.endpoint,
        namespace = %config.namespace,
        database = %config.database,
        "Opening database"
    );

    let db = any::connect(config.endpoint.as_str()).await?;
    if config.is_remote() {
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
    }
    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await?;

    run_migrations(&db).await?;
    let seed = seed_defaults(&db).await?;
    Ok((db, seed))
}
