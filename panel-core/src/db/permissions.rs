//! Permission Repository
//!
//! Permission rows are keyed by their prefixed name and mirror the catalog.

use shared::models::Permission;
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::config::GranularConfig;
use crate::error::RbacResult;
use crate::rbac::catalog::ALL_PERMISSIONS;

pub async fn find_all<'e>(db: impl SqliteExecutor<'e>) -> RbacResult<Vec<Permission>> {
    let permissions =
        sqlx::query_as::<_, Permission>("SELECT name, description FROM permission ORDER BY name")
            .fetch_all(db)
            .await?;
    Ok(permissions)
}

pub async fn find_by_name<'e>(
    db: impl SqliteExecutor<'e>,
    name: &str,
) -> RbacResult<Option<Permission>> {
    let permission =
        sqlx::query_as::<_, Permission>("SELECT name, description FROM permission WHERE name = ?")
            .bind(name)
            .fetch_optional(db)
            .await?;
    Ok(permission)
}

/// Make the permission table match the catalog: insert missing entries,
/// refresh descriptions, drop rows the catalog no longer knows.
/// Returns `(upserted, removed)`.
pub async fn sync_catalog(
    conn: &mut SqliteConnection,
    config: &GranularConfig,
) -> RbacResult<(usize, u64)> {
    let names: Vec<String> = ALL_PERMISSIONS
        .iter()
        .map(|p| config.normalize(p.slug()))
        .collect();

    for (permission, name) in ALL_PERMISSIONS.iter().zip(&names) {
        sqlx::query(
            "INSERT INTO permission (name, description) VALUES (?, ?) ON CONFLICT(name) DO UPDATE SET description = excluded.description",
        )
        .bind(name)
        .bind(permission.description())
        .execute(&mut *conn)
        .await?;
    }

    let sql = format!(
        "DELETE FROM permission WHERE name NOT IN ({})",
        super::placeholders(names.len())
    );
    let mut stale = sqlx::query(&sql);
    for name in &names {
        stale = stale.bind(name);
    }
    let removed = stale.execute(&mut *conn).await?.rows_affected();

    Ok((names.len(), removed))
}
