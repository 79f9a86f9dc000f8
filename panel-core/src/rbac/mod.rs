//! Granular permission engine
//!
//! ```text
//! rbac/
//! ├── catalog     # fixed permission set and built-in roles
//! ├── graph       # typed intermediate graph, soft-delete visibility
//! ├── query       # graph hydration at Full / Safe / Min fidelity
//! ├── transform   # graph -> view models, effective sets
//! ├── authorize   # predicates over view models
//! ├── mutation    # assign / sync / remove on relationship tables
//! └── access      # principal loading
//! ```

pub mod access;
pub mod authorize;
pub mod catalog;
pub mod graph;
pub mod mutation;
pub mod query;
pub mod transform;

pub use access::load_principal;
pub use authorize::{Authorizer, Requested, RoleHolder, in_all_groups, in_any_group, in_group};
pub use catalog::GranularPermission;
pub use graph::Fidelity;
pub use mutation::Mutations;
