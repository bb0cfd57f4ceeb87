//! SurrealDB repository implementations.

mod authorization;
mod operation_log;
mod permission;
mod role;
mod session;
pub(crate) mod support;
mod user;

pub use authorization::SurrealAuthorizationRepository;
pub use operation_log::SurrealOperationLogRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;
