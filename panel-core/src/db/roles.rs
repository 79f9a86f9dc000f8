//! Role Repository

use shared::models::{Role, RoleCreate, RoleUpdate};
use shared::util::snowflake_id;
use sqlx::{SqliteExecutor, SqlitePool};
use validator::Validate;

use crate::error::{Entity, RbacError, RbacResult};

pub async fn find_by_id<'e>(db: impl SqliteExecutor<'e>, id: i64) -> RbacResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, deleted, protected FROM role WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(role)
}

pub async fn find_by_name<'e>(db: impl SqliteExecutor<'e>, name: &str) -> RbacResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, deleted, protected FROM role WHERE name = ? LIMIT 1",
    )
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(role)
}

/// Every role including soft-deleted ones, by name
pub async fn find_all<'e>(db: impl SqliteExecutor<'e>) -> RbacResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, deleted, protected FROM role ORDER BY name",
    )
    .fetch_all(db)
    .await?;
    Ok(roles)
}

/// Live roles only, by name
pub async fn find_available<'e>(db: impl SqliteExecutor<'e>) -> RbacResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, deleted, protected FROM role WHERE deleted = 0 ORDER BY name",
    )
    .fetch_all(db)
    .await?;
    Ok(roles)
}

pub(crate) async fn require<'e>(db: impl SqliteExecutor<'e>, id: i64) -> RbacResult<Role> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| RbacError::not_found(Entity::Role, id))
}

/// Insert a role row without validation (seeding uses this for built-ins)
pub(crate) async fn insert<'e>(
    db: impl SqliteExecutor<'e>,
    name: &str,
    description: Option<&str>,
    protected: bool,
) -> RbacResult<i64> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO role (id, name, description, deleted, protected) VALUES (?, ?, ?, 0, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(protected)
    .execute(db)
    .await?;
    Ok(id)
}

/// Create a custom (unprotected) role
pub async fn create(pool: &SqlitePool, data: RoleCreate) -> RbacResult<Role> {
    data.validate()?;

    let mut tx = super::begin_write(pool).await?;
    if find_by_name(&mut *tx, &data.name).await?.is_some() {
        return Err(RbacError::RoleNameTaken(data.name));
    }
    let id = insert(&mut *tx, &data.name, data.description.as_deref(), false).await?;
    let role = require(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(target: "audit", role_id = id, name = %role.name, "Role created");
    Ok(role)
}

/// Update name/description. Protected roles may be renamed and described;
/// only their permission set and deletion are locked.
pub async fn update(pool: &SqlitePool, id: i64, data: RoleUpdate) -> RbacResult<Role> {
    data.validate()?;

    let mut tx = super::begin_write(pool).await?;
    require(&mut *tx, id).await?;

    if let Some(name) = &data.name
        && let Some(other) = find_by_name(&mut *tx, name).await?
        && other.id != id
    {
        return Err(RbacError::RoleNameTaken(name.clone()));
    }

    sqlx::query(
        "UPDATE role SET name = COALESCE(?1, name), description = COALESCE(?2, description) WHERE id = ?3",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let role = require(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(role)
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> RbacResult<Role> {
    let role = require(pool, id).await?;
    if role.protected {
        tracing::warn!(role_id = id, "Refused to delete protected role");
        return Err(RbacError::Protected { role_id: id });
    }

    sqlx::query("UPDATE role SET deleted = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    tracing::info!(target: "audit", role_id = id, "Role soft-deleted");
    require(pool, id).await
}

pub async fn restore(pool: &SqlitePool, id: i64) -> RbacResult<Role> {
    let rows = sqlx::query("UPDATE role SET deleted = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RbacError::not_found(Entity::Role, id));
    }
    tracing::info!(target: "audit", role_id = id, "Role restored");
    require(pool, id).await
}

/// Hard-delete a soft-deleted, unprotected role and all of its junction rows
pub async fn permanently_delete(pool: &SqlitePool, id: i64) -> RbacResult<()> {
    let mut tx = super::begin_write(pool).await?;

    let role = require(&mut *tx, id).await?;
    if role.protected {
        tracing::warn!(role_id = id, "Refused to purge protected role");
        return Err(RbacError::Protected { role_id: id });
    }
    if !role.deleted {
        return Err(RbacError::NotDeleted {
            entity: Entity::Role,
            id,
        });
    }

    for sql in [
        "DELETE FROM users_to_roles WHERE role_id = ?",
        "DELETE FROM permissions_to_roles WHERE role_id = ?",
        "DELETE FROM groups_to_roles WHERE role_id = ?",
        "DELETE FROM role WHERE id = ?",
    ] {
        sqlx::query(sql).bind(id).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(target: "audit", role_id = id, "Role permanently deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    fn payload(name: &str) -> RoleCreate {
        RoleCreate {
            name: name.into(),
            description: Some("desc".into()),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_names() {
        let db = DbService::in_memory().await.unwrap();
        let role = create(&db.pool, payload("Editor")).await.unwrap();
        assert!(!role.protected);
        assert!(!role.deleted);

        let err = create(&db.pool, payload("Editor")).await.unwrap_err();
        assert!(matches!(err, RbacError::RoleNameTaken(_)));
    }

    #[tokio::test]
    async fn update_is_partial() {
        let db = DbService::in_memory().await.unwrap();
        let role = create(&db.pool, payload("Editor")).await.unwrap();
        create(&db.pool, payload("Viewer")).await.unwrap();

        let updated = update(
            &db.pool,
            role.id,
            RoleUpdate {
                name: Some("Writer".into()),
                description: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Writer");
        assert_eq!(updated.description.as_deref(), Some("desc"));

        let err = update(
            &db.pool,
            role.id,
            RoleUpdate {
                name: Some("Viewer".into()),
                description: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RbacError::RoleNameTaken(_)));
    }

    #[tokio::test]
    async fn protected_roles_cannot_be_deleted() {
        let db = DbService::in_memory().await.unwrap();
        let id = insert(&db.pool, "Administrator", None, true).await.unwrap();

        let err = soft_delete(&db.pool, id).await.unwrap_err();
        assert!(matches!(err, RbacError::Protected { role_id } if role_id == id));

        let err = permanently_delete(&db.pool, id).await.unwrap_err();
        assert!(matches!(err, RbacError::Protected { .. }));
    }

    #[tokio::test]
    async fn lifecycle_soft_restore_purge() {
        let db = DbService::in_memory().await.unwrap();
        let role = create(&db.pool, payload("Temp")).await.unwrap();

        assert!(matches!(
            permanently_delete(&db.pool, role.id).await.unwrap_err(),
            RbacError::NotDeleted { .. }
        ));

        assert!(soft_delete(&db.pool, role.id).await.unwrap().deleted);
        assert!(find_available(&db.pool).await.unwrap().is_empty());
        assert!(!restore(&db.pool, role.id).await.unwrap().deleted);

        soft_delete(&db.pool, role.id).await.unwrap();
        permanently_delete(&db.pool, role.id).await.unwrap();
        assert!(find_by_id(&db.pool, role.id).await.unwrap().is_none());
        assert!(matches!(
            restore(&db.pool, role.id).await.unwrap_err(),
            RbacError::NotFound { .. }
        ));
    }
}
