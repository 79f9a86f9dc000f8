//! Group Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Group entity (aggregates users, roles and direct permissions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deleted: bool,
}

/// Create group payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroupCreate {
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    pub description: Option<String>,
}

/// Update group payload (None = unchanged)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GroupUpdate {
    #[validate(length(min = 1, max = 32))]
    pub name: Option<String>,
    pub description: Option<String>,
}
