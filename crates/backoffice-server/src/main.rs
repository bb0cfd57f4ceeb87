//! Backoffice Server: applies migrations, seeds defaults, provisions the
//! initial administrator and sweeps expired sessions until shutdown.

mod bootstrap;
mod config;

use std::time::Duration;

use anyhow::Context;
use backoffice_core::repository::SessionRepository;
use backoffice_db::repository::{
    SurrealOperationLogRepository, SurrealRoleRepository, SurrealSessionRepository,
    SurrealUserRepository,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("backoffice=info,info"))
        .context("build log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    info!("Starting backoffice server");

    let config = ServerConfig::from_env().context("load configuration")?;

    let (db, seed) = backoffice_db::open(&config.db)
        .await
        .context("open database")?;
    info!(
        seeded = seed.seeded,
        permissions = seed.permissions,
        roles = seed.roles,
        "Database ready"
    );

    if let Some(admin) = &config.initial_admin {
        let users = match &config.auth.pepper {
            Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper.clone()),
            None => SurrealUserRepository::new(db.clone()),
        };
        bootstrap::ensure_initial_admin(
            &users,
            &SurrealRoleRepository::new(db.clone()),
            &SurrealOperationLogRepository::new(db.clone()),
            admin,
            config.auth.min_password_length,
        )
        .await
        .context("provision initial administrator")?;
    }

    let sessions = SurrealSessionRepository::new(db);
    let mut sweep = tokio::time::interval(Duration::from_secs(
        config.session_sweep_interval_secs.max(1),
    ));

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                match sessions.cleanup_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Expired sessions swept"),
                    Err(e) => error!(error = %e, "Session sweep failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Backoffice server stopped");
    Ok(())
}
