//! Backoffice Database: SurrealDB connection management, schema
//! migrations and repository implementations.
//!
//! This crate provides:
//! - Opening a migrated, seeded store ([`open`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Default permission and role seeding ([`seed_defaults`])
//! - Repository implementations of the `backoffice-core` traits
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;
mod seed;

pub use connection::{DbConfig, open};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
pub use seed::{DEFAULT_ADMIN_ROLE, DEFAULT_USER_ROLE, SeedReport, seed_defaults};
