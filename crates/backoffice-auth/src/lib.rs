//! Backoffice Auth: password login, opaque session tokens, role and
//! permission gates, and the audited administration layer.

pub mod admin;
pub mod authz;
pub mod config;
pub mod error;
pub mod identity;
pub mod password;
pub mod service;
pub mod token;

pub use admin::AdminService;
pub use authz::Authorizer;
pub use config::AuthConfig;
pub use error::AuthError;
pub use identity::AuthenticatedUser;
pub use service::{AuthService, LoginInput, LoginOutput, RegisterInput};
