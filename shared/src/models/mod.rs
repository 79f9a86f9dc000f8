//! Data models
//!
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Users, roles and groups are keyed by `i64` snowflake ids; permissions are
//! keyed by their prefixed name.

pub mod group;
pub mod permission;
pub mod role;
pub mod user;
pub mod views;

// Re-exports
pub use group::*;
pub use permission::*;
pub use role::*;
pub use user::*;
pub use views::*;
