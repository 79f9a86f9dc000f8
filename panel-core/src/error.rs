//! Engine error type
//!
//! `RbacError` is what the query, mutation and access layers return.
//! Converting into [`AppError`] picks the matching [`ErrorCode`] so a host web
//! framework can answer with the right status.

use std::fmt;

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Entity kinds that can be missing or in the wrong lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Role,
    Group,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::User => "user",
            Entity::Role => "role",
            Entity::Group => "group",
        })
    }
}

#[derive(Debug, Error)]
pub enum RbacError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Role {role_id} is protected")]
    Protected { role_id: i64 },

    #[error("Email {0} is already registered")]
    EmailTaken(String),

    #[error("User {user_id} has already completed setup")]
    AlreadyConfigured { user_id: i64 },

    #[error("Role name {0} is already taken")]
    RoleNameTaken(String),

    #[error("{entity} {id} must be deleted first")]
    NotDeleted { entity: Entity, id: i64 },

    #[error("User {user_id} has not completed setup")]
    SetupRequired { user_id: i64 },

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl RbacError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        RbacError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for engine operations
pub type RbacResult<T> = Result<T, RbacError>;

impl From<RbacError> for AppError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::NotFound { entity, id } => {
                let code = match entity {
                    Entity::User => ErrorCode::UserNotFound,
                    Entity::Role => ErrorCode::RoleNotFound,
                    Entity::Group => ErrorCode::GroupNotFound,
                };
                AppError::new(code).with_detail("id", id)
            }
            RbacError::Forbidden(msg) => AppError::permission_denied(msg),
            RbacError::Validation(errors) => {
                let mut app = AppError::new(ErrorCode::ValidationFailed);
                for (field, field_errors) in errors.field_errors() {
                    let codes: Vec<String> =
                        field_errors.iter().map(|e| e.code.to_string()).collect();
                    app = app.with_detail(field.to_string(), codes);
                }
                app
            }
            RbacError::Protected { role_id } => {
                AppError::new(ErrorCode::RoleProtected).with_detail("role_id", role_id)
            }
            err @ RbacError::EmailTaken(_) => {
                AppError::with_message(ErrorCode::EmailExists, err.to_string())
            }
            RbacError::AlreadyConfigured { user_id } => {
                AppError::new(ErrorCode::UserAlreadyConfigured).with_detail("user_id", user_id)
            }
            RbacError::RoleNameTaken(name) => {
                AppError::new(ErrorCode::RoleNameExists).with_detail("name", name)
            }
            RbacError::NotDeleted { entity, id } => {
                let code = match entity {
                    Entity::User => ErrorCode::UserNotDeleted,
                    Entity::Role => ErrorCode::RoleNotDeleted,
                    Entity::Group => ErrorCode::GroupNotDeleted,
                };
                AppError::new(code).with_detail("id", id)
            }
            RbacError::SetupRequired { user_id } => {
                AppError::new(ErrorCode::SetupRequired).with_detail("user_id", user_id)
            }
            RbacError::Persistence(e) => {
                tracing::error!(error = %e, "Persistence failure");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}
