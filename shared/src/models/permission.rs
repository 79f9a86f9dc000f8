//! Permission Model

use serde::{Deserialize, Serialize};

/// Permission row, identified by its prefixed name
/// (e.g. `granular-perms.create-new-user`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Permission {
    pub name: String,
    pub description: Option<String>,
}
