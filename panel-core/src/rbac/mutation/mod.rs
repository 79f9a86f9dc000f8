//! Mutation layer
//!
//! Assign / sync / remove / clear operations on the relationship tables.
//! Every public operation runs in one transaction. Referenced items that do
//! not exist are skipped silently; the target entity must exist.
//!
//! - assign: insert only what the target does not already hold
//! - sync: replace the target's set (empty input clears it)
//! - remove: delete the listed entries (empty input is a no-op)

mod groups;
mod permissions;
mod roles;

use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::config::GranularConfig;
use crate::db;
use crate::error::{Entity, RbacError, RbacResult};

/// One side of a junction table: rows owned by `owner`, pointing at `item`,
/// where `item` must exist as `source.source_key`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Junction {
    pub table: &'static str,
    pub owner: &'static str,
    pub item: &'static str,
    pub source: &'static str,
    pub source_key: &'static str,
}

pub(crate) const USER_PERMISSIONS: Junction = Junction {
    table: "users_to_permissions",
    owner: "user_id",
    item: "permission_name",
    source: "permission",
    source_key: "name",
};

pub(crate) const ROLE_PERMISSIONS: Junction = Junction {
    table: "permissions_to_roles",
    owner: "role_id",
    item: "permission_name",
    source: "permission",
    source_key: "name",
};

pub(crate) const GROUP_PERMISSIONS: Junction = Junction {
    table: "groups_to_permissions",
    owner: "group_id",
    item: "permission_name",
    source: "permission",
    source_key: "name",
};

pub(crate) const USER_ROLES: Junction = Junction {
    table: "users_to_roles",
    owner: "user_id",
    item: "role_id",
    source: "role",
    source_key: "id",
};

pub(crate) const ROLE_USERS: Junction = Junction {
    table: "users_to_roles",
    owner: "role_id",
    item: "user_id",
    source: "auth_user",
    source_key: "id",
};

pub(crate) const GROUP_ROLES: Junction = Junction {
    table: "groups_to_roles",
    owner: "group_id",
    item: "role_id",
    source: "role",
    source_key: "id",
};

pub(crate) const ROLE_GROUPS: Junction = Junction {
    table: "groups_to_roles",
    owner: "role_id",
    item: "group_id",
    source: "user_group",
    source_key: "id",
};

pub(crate) const USER_GROUPS: Junction = Junction {
    table: "users_to_groups",
    owner: "user_id",
    item: "group_id",
    source: "user_group",
    source_key: "id",
};

pub(crate) const GROUP_USERS: Junction = Junction {
    table: "users_to_groups",
    owner: "group_id",
    item: "user_id",
    source: "auth_user",
    source_key: "id",
};

/// Insert `(owner, item)` rows for items that exist. Existing rows are kept.
/// Returns the number of rows actually inserted.
pub(crate) async fn insert_items<T>(
    conn: &mut SqliteConnection,
    junction: Junction,
    owner: i64,
    items: &[T],
) -> RbacResult<u64>
where
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Sync,
{
    let sql = format!(
        "INSERT INTO {table} ({owner}, {item}) SELECT ?, {key} FROM {source} WHERE {key} = ? ON CONFLICT DO NOTHING",
        table = junction.table,
        owner = junction.owner,
        item = junction.item,
        key = junction.source_key,
        source = junction.source,
    );

    let mut inserted = 0;
    for item in items {
        inserted += sqlx::query(&sql)
            .bind(owner)
            .bind(item)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    Ok(inserted)
}

/// Delete the listed items from `owner`'s set
pub(crate) async fn delete_items<T>(
    conn: &mut SqliteConnection,
    junction: Junction,
    owner: i64,
    items: &[T],
) -> RbacResult<u64>
where
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Sync,
{
    if items.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "DELETE FROM {} WHERE {} = ? AND {} IN ({})",
        junction.table,
        junction.owner,
        junction.item,
        db::placeholders(items.len())
    );
    let mut query = sqlx::query(&sql).bind(owner);
    for item in items {
        query = query.bind(item);
    }
    Ok(query.execute(&mut *conn).await?.rows_affected())
}

pub(crate) async fn clear_items(
    conn: &mut SqliteConnection,
    junction: Junction,
    owner: i64,
) -> RbacResult<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        junction.table, junction.owner
    );
    Ok(sqlx::query(&sql)
        .bind(owner)
        .execute(&mut *conn)
        .await?
        .rows_affected())
}

/// Clear then insert: `owner`'s set becomes exactly the existing `items`
pub(crate) async fn replace_items<T>(
    conn: &mut SqliteConnection,
    junction: Junction,
    owner: i64,
    items: &[T],
) -> RbacResult<u64>
where
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Sync,
{
    clear_items(conn, junction, owner).await?;
    insert_items(conn, junction, owner, items).await
}

/// Ids in first-seen order without repeats
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// Write side of the permission engine, bound to one pool and configuration
#[derive(Debug, Clone)]
pub struct Mutations {
    pool: SqlitePool,
    config: GranularConfig,
}

impl Mutations {
    pub fn new(pool: SqlitePool, config: GranularConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &GranularConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn require_user(conn: &mut SqliteConnection, id: i64) -> RbacResult<()> {
    match db::users::find_by_id(&mut *conn, id).await? {
        Some(_) => Ok(()),
        None => Err(RbacError::not_found(Entity::User, id)),
    }
}

/// Role must exist and must not be protected
async fn require_unprotected_role(conn: &mut SqliteConnection, id: i64) -> RbacResult<()> {
    let role = db::roles::require(&mut *conn, id).await?;
    if role.protected {
        tracing::warn!(role_id = id, "Refused to change permissions of protected role");
        return Err(RbacError::Protected { role_id: id });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use shared::models::{GroupCreate, RoleCreate, UserConfigCreate, UserCreate};

    use super::Mutations;
    use crate::config::GranularConfig;
    use crate::db::{self, DbService};

    pub async fn engine() -> (DbService, Mutations) {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        db::permissions::sync_catalog(&mut conn, &GranularConfig::default())
            .await
            .unwrap();
        drop(conn);
        let mutations = Mutations::new(db.pool.clone(), GranularConfig::default());
        (db, mutations)
    }

    pub async fn user(db: &DbService, email: &str) -> i64 {
        let user = db::users::create(
            &db.pool,
            UserCreate {
                email: email.into(),
                verified: true,
            },
        )
        .await
        .unwrap();
        db::users::complete_setup(
            &db.pool,
            user.id,
            UserConfigCreate {
                displayname: "member".into(),
                firstname: "Member".into(),
                lastname: None,
                mobile: None,
            },
        )
        .await
        .unwrap();
        user.id
    }

    pub async fn role(db: &DbService, name: &str) -> i64 {
        db::roles::create(
            &db.pool,
            RoleCreate {
                name: name.into(),
                description: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    pub async fn group(db: &DbService, name: &str) -> i64 {
        db::groups::create(
            &db.pool,
            GroupCreate {
                name: name.into(),
                description: None,
            },
        )
        .await
        .unwrap()
        .id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_keep_first_occurrence() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[tokio::test]
    async fn insert_skips_unknown_items_and_existing_rows() {
        let (db, _) = testing::engine().await;
        let user = testing::user(&db, "a@example.com").await;
        let mut conn = db.pool.acquire().await.unwrap();

        let names = vec![
            "granular-perms.create-role".to_string(),
            "granular-perms.nope".to_string(),
        ];
        let n = insert_items(&mut conn, USER_PERMISSIONS, user, &names)
            .await
            .unwrap();
        assert_eq!(n, 1);

        let n = insert_items(&mut conn, USER_PERMISSIONS, user, &names[..1])
            .await
            .unwrap();
        assert_eq!(n, 0);

        let n = replace_items::<String>(&mut conn, USER_PERMISSIONS, user, &[])
            .await
            .unwrap();
        assert_eq!(n, 0);
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users_to_permissions")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }
}
