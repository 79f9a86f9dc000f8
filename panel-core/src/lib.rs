//! Panel Core - granular RBAC permission engine
//!
//! Users hold permissions directly, through roles, and through groups (which
//! carry permissions and roles of their own). This crate stores those
//! relationships in SQLite, hydrates them into view models and answers
//! authorization questions over them.
//!
//! ```text
//! panel-core/src/
//! ├── config.rs     # environment configuration
//! ├── error.rs      # RbacError -> AppError
//! ├── logger.rs     # tracing subscriber setup
//! ├── db/           # pool, migrations, entity repositories, seeding
//! └── rbac/         # catalog, query, transform, authorize, mutation
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod rbac;

pub use config::{Config, GranularConfig};
pub use db::DbService;
pub use error::{Entity, RbacError, RbacResult};
pub use logger::init_logger;
pub use rbac::{Authorizer, Fidelity, GranularPermission, Mutations, load_principal};
