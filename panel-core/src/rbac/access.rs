//! Principal loading
//!
//! Turns a trusted user id from the identity provider into the Full view
//! the authorizer checks against.

use shared::models::FullUser;
use sqlx::SqlitePool;

use super::query;
use crate::error::{Entity, RbacError, RbacResult};

/// Full view of an active, set-up user
pub async fn load_principal(pool: &SqlitePool, user_id: i64) -> RbacResult<FullUser> {
    let mut conn = pool.acquire().await?;

    let user = query::full_user(&mut conn, user_id)
        .await?
        .filter(|u| !u.user.deleted)
        .ok_or_else(|| RbacError::not_found(Entity::User, user_id))?;

    if user.config.is_none() {
        tracing::debug!(user_id, "Principal has not completed setup");
        return Err(RbacError::SetupRequired { user_id });
    }
    Ok(user)
}
