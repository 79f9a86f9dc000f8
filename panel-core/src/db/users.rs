//! User Repository
//!
//! Identity rows and the one-per-user profile. Credentials live with the
//! identity provider; this side only tracks flags and relationships.

use shared::models::{User, UserConfig, UserConfigCreate, UserConfigUpdate, UserCreate};
use shared::util::{now_millis, snowflake_id};
use sqlx::{SqliteExecutor, SqlitePool};
use validator::Validate;

use crate::error::{Entity, RbacError, RbacResult};

pub async fn find_by_id<'e>(db: impl SqliteExecutor<'e>, id: i64) -> RbacResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, verified, deleted, root, created_at FROM auth_user WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_email<'e>(
    db: impl SqliteExecutor<'e>,
    email: &str,
) -> RbacResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, verified, deleted, root, created_at FROM auth_user WHERE email = ? COLLATE NOCASE LIMIT 1",
    )
    .bind(email.trim())
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_config<'e>(
    db: impl SqliteExecutor<'e>,
    user_id: i64,
) -> RbacResult<Option<UserConfig>> {
    let config = sqlx::query_as::<_, UserConfig>(
        "SELECT id, user_id, displayname, firstname, lastname, mobile FROM user_config WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(config)
}

/// All users, oldest first
pub async fn find_all<'e>(db: impl SqliteExecutor<'e>) -> RbacResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, email, verified, deleted, root, created_at FROM auth_user ORDER BY created_at, id",
    )
    .fetch_all(db)
    .await?;
    Ok(users)
}

async fn require<'e>(db: impl SqliteExecutor<'e>, id: i64) -> RbacResult<User> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| RbacError::not_found(Entity::User, id))
}

/// Register a user. The very first user becomes root.
pub async fn create(pool: &SqlitePool, data: UserCreate) -> RbacResult<User> {
    data.validate()?;

    let mut tx = super::begin_write(pool).await?;

    if find_by_email(&mut *tx, &data.email).await?.is_some() {
        return Err(RbacError::EmailTaken(data.email));
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_user")
        .fetch_one(&mut *tx)
        .await?;
    let root = existing == 0;

    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO auth_user (id, email, verified, deleted, root, created_at) VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(id)
    .bind(data.email.trim())
    .bind(data.verified)
    .bind(root)
    .bind(now_millis())
    .execute(&mut *tx)
    .await?;

    let user = require(&mut *tx, id).await?;
    tx.commit().await?;

    if root {
        tracing::info!(target: "audit", user_id = id, "First user bootstrapped as root");
    }
    tracing::info!(target: "audit", user_id = id, "User created");
    Ok(user)
}

/// Onboarding: create the user's profile. Allowed once.
pub async fn complete_setup(
    pool: &SqlitePool,
    user_id: i64,
    data: UserConfigCreate,
) -> RbacResult<UserConfig> {
    data.validate()?;

    let mut tx = super::begin_write(pool).await?;
    require(&mut *tx, user_id).await?;

    if find_config(&mut *tx, user_id).await?.is_some() {
        return Err(RbacError::AlreadyConfigured { user_id });
    }

    sqlx::query(
        "INSERT INTO user_config (id, user_id, displayname, firstname, lastname, mobile) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(snowflake_id())
    .bind(user_id)
    .bind(&data.displayname)
    .bind(&data.firstname)
    .bind(&data.lastname)
    .bind(&data.mobile)
    .execute(&mut *tx)
    .await?;

    let config = find_config(&mut *tx, user_id)
        .await?
        .ok_or(RbacError::SetupRequired { user_id })?;
    tx.commit().await?;

    tracing::info!(target: "audit", user_id, "User setup completed");
    Ok(config)
}

/// Partial profile update (`None` fields stay as they are)
pub async fn update_config(
    pool: &SqlitePool,
    user_id: i64,
    data: UserConfigUpdate,
) -> RbacResult<UserConfig> {
    data.validate()?;

    let rows = sqlx::query(
        "UPDATE user_config SET displayname = COALESCE(?1, displayname), firstname = COALESCE(?2, firstname), lastname = COALESCE(?3, lastname), mobile = COALESCE(?4, mobile) WHERE user_id = ?5",
    )
    .bind(&data.displayname)
    .bind(&data.firstname)
    .bind(&data.lastname)
    .bind(&data.mobile)
    .bind(user_id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        require(pool, user_id).await?;
        return Err(RbacError::SetupRequired { user_id });
    }
    find_config(pool, user_id)
        .await?
        .ok_or(RbacError::SetupRequired { user_id })
}

pub async fn set_verified(pool: &SqlitePool, id: i64, verified: bool) -> RbacResult<User> {
    let rows = sqlx::query("UPDATE auth_user SET verified = ? WHERE id = ?")
        .bind(verified)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RbacError::not_found(Entity::User, id));
    }
    require(pool, id).await
}

async fn set_deleted(pool: &SqlitePool, id: i64, deleted: bool) -> RbacResult<User> {
    let rows = sqlx::query("UPDATE auth_user SET deleted = ? WHERE id = ?")
        .bind(deleted)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RbacError::not_found(Entity::User, id));
    }
    tracing::info!(target: "audit", user_id = id, deleted, "User deleted flag changed");
    require(pool, id).await
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> RbacResult<User> {
    set_deleted(pool, id, true).await
}

pub async fn restore(pool: &SqlitePool, id: i64) -> RbacResult<User> {
    set_deleted(pool, id, false).await
}

/// Purge a soft-deleted user with its profile and every relationship row
pub async fn permanently_delete(pool: &SqlitePool, id: i64) -> RbacResult<()> {
    let mut tx = super::begin_write(pool).await?;

    let user = require(&mut *tx, id).await?;
    if !user.deleted {
        return Err(RbacError::NotDeleted {
            entity: Entity::User,
            id,
        });
    }

    for sql in [
        "DELETE FROM users_to_roles WHERE user_id = ?",
        "DELETE FROM users_to_permissions WHERE user_id = ?",
        "DELETE FROM users_to_groups WHERE user_id = ?",
        "DELETE FROM user_config WHERE user_id = ?",
        "DELETE FROM auth_user WHERE id = ?",
    ] {
        sqlx::query(sql).bind(id).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(target: "audit", user_id = id, "User permanently deleted");
    Ok(())
}
