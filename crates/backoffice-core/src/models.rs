//! Domain models for the back-office access-control core.
//!
//! These are the types shared across all crates.

pub mod operation_log;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;
