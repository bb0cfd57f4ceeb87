//! Backoffice Core: domain models, error types and repository traits
//! for the access-control core of the back-office application.

pub mod error;
pub mod models;
pub mod repository;
