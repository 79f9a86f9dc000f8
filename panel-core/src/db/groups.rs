//! Group Repository

use shared::models::{Group, GroupCreate, GroupUpdate};
use shared::util::snowflake_id;
use sqlx::{SqliteExecutor, SqlitePool};
use validator::Validate;

use crate::error::{Entity, RbacError, RbacResult};

pub async fn find_by_id<'e>(db: impl SqliteExecutor<'e>, id: i64) -> RbacResult<Option<Group>> {
    let group = sqlx::query_as::<_, Group>(
        "SELECT id, name, description, deleted FROM user_group WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(group)
}

pub async fn find_all<'e>(db: impl SqliteExecutor<'e>) -> RbacResult<Vec<Group>> {
    let groups = sqlx::query_as::<_, Group>(
        "SELECT id, name, description, deleted FROM user_group ORDER BY name",
    )
    .fetch_all(db)
    .await?;
    Ok(groups)
}

pub async fn find_available<'e>(db: impl SqliteExecutor<'e>) -> RbacResult<Vec<Group>> {
    let groups = sqlx::query_as::<_, Group>(
        "SELECT id, name, description, deleted FROM user_group WHERE deleted = 0 ORDER BY name",
    )
    .fetch_all(db)
    .await?;
    Ok(groups)
}

pub(crate) async fn require<'e>(db: impl SqliteExecutor<'e>, id: i64) -> RbacResult<Group> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| RbacError::not_found(Entity::Group, id))
}

pub async fn create(pool: &SqlitePool, data: GroupCreate) -> RbacResult<Group> {
    data.validate()?;

    let id = snowflake_id();
    sqlx::query("INSERT INTO user_group (id, name, description, deleted) VALUES (?, ?, ?, 0)")
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .execute(pool)
        .await?;

    tracing::info!(target: "audit", group_id = id, name = %data.name, "Group created");
    require(pool, id).await
}

pub async fn update(pool: &SqlitePool, id: i64, data: GroupUpdate) -> RbacResult<Group> {
    data.validate()?;

    let rows = sqlx::query(
        "UPDATE user_group SET name = COALESCE(?1, name), description = COALESCE(?2, description) WHERE id = ?3",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RbacError::not_found(Entity::Group, id));
    }
    require(pool, id).await
}

async fn set_deleted(pool: &SqlitePool, id: i64, deleted: bool) -> RbacResult<Group> {
    let rows = sqlx::query("UPDATE user_group SET deleted = ? WHERE id = ?")
        .bind(deleted)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RbacError::not_found(Entity::Group, id));
    }
    tracing::info!(target: "audit", group_id = id, deleted, "Group deleted flag changed");
    require(pool, id).await
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> RbacResult<Group> {
    set_deleted(pool, id, true).await
}

pub async fn restore(pool: &SqlitePool, id: i64) -> RbacResult<Group> {
    set_deleted(pool, id, false).await
}

/// Hard-delete a soft-deleted group and its membership/grant rows
pub async fn permanently_delete(pool: &SqlitePool, id: i64) -> RbacResult<()> {
    let mut tx = super::begin_write(pool).await?;

    let group = require(&mut *tx, id).await?;
    if !group.deleted {
        return Err(RbacError::NotDeleted {
            entity: Entity::Group,
            id,
        });
    }

    for sql in [
        "DELETE FROM users_to_groups WHERE group_id = ?",
        "DELETE FROM groups_to_roles WHERE group_id = ?",
        "DELETE FROM groups_to_permissions WHERE group_id = ?",
        "DELETE FROM user_group WHERE id = ?",
    ] {
        sqlx::query(sql).bind(id).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(target: "audit", group_id = id, "Group permanently deleted");
    Ok(())
}
