//! User membership in groups

use shared::models::SafeUser;
use sqlx::SqliteConnection;

use super::{
    GROUP_USERS, Mutations, USER_GROUPS, clear_items, dedup_ids, delete_items, insert_items,
    replace_items, require_user,
};
use crate::db;
use crate::error::{Entity, RbacError, RbacResult};
use crate::rbac::authorize::{in_all_groups, in_group};
use crate::rbac::graph::Fidelity;
use crate::rbac::{query, transform};

async fn safe_user(conn: &mut SqliteConnection, user_id: i64) -> RbacResult<SafeUser> {
    query::user(conn, user_id, Fidelity::Safe)
        .await?
        .map(|node| transform::to_safe_user(&node))
        .ok_or_else(|| RbacError::not_found(Entity::User, user_id))
}

/// Insert memberships the user lacks; returns rows inserted
async fn join_groups(
    conn: &mut SqliteConnection,
    user_id: i64,
    group_ids: &[i64],
) -> RbacResult<u64> {
    let user = safe_user(conn, user_id).await?;
    if group_ids.is_empty() || in_all_groups(&user, group_ids) {
        return Ok(0);
    }

    let missing: Vec<i64> = dedup_ids(group_ids)
        .into_iter()
        .filter(|id| !in_group(&user, *id))
        .collect();
    insert_items(conn, USER_GROUPS, user_id, &missing).await
}

impl Mutations {
    pub async fn add_user_to_groups(&self, user_id: i64, group_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        let joined = join_groups(&mut tx, user_id, group_ids).await?;
        tx.commit().await?;

        if joined > 0 {
            tracing::info!(target: "audit", user_id, joined, "User added to groups");
        }
        Ok(())
    }

    pub async fn add_user_to_group(&self, user_id: i64, group_id: i64) -> RbacResult<()> {
        self.add_user_to_groups(user_id, &[group_id]).await
    }

    /// Every listed user joins every listed group. One missing user aborts all.
    pub async fn add_users_to_groups(&self, user_ids: &[i64], group_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        let mut joined = 0;
        for user_id in dedup_ids(user_ids) {
            joined += join_groups(&mut tx, user_id, group_ids).await?;
        }
        tx.commit().await?;

        tracing::info!(target: "audit", users = user_ids.len(), joined, "Users added to groups");
        Ok(())
    }

    pub async fn add_users_to_group(&self, user_ids: &[i64], group_id: i64) -> RbacResult<()> {
        self.add_users_to_groups(user_ids, &[group_id]).await
    }

    /// Replace the members of a group
    pub async fn sync_users_to_group(&self, group_id: i64, user_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        db::groups::require(&mut *tx, group_id).await?;
        let members = replace_items(&mut tx, GROUP_USERS, group_id, &dedup_ids(user_ids)).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", group_id, members, "Group members synced");
        Ok(())
    }

    /// Replace the groups of a user
    pub async fn sync_groups_to_user(&self, user_id: i64, group_ids: &[i64]) -> RbacResult<()> {
        self.sync_groups_to_users(&[user_id], group_ids).await
    }

    /// Every listed user ends up in exactly the listed groups
    pub async fn sync_groups_to_users(
        &self,
        user_ids: &[i64],
        group_ids: &[i64],
    ) -> RbacResult<()> {
        let groups = dedup_ids(group_ids);

        let mut tx = db::begin_write(&self.pool).await?;
        for user_id in dedup_ids(user_ids) {
            require_user(&mut tx, user_id).await?;
            replace_items(&mut tx, USER_GROUPS, user_id, &groups).await?;
        }
        tx.commit().await?;

        tracing::info!(
            target: "audit",
            users = user_ids.len(),
            groups = groups.len(),
            "User groups synced"
        );
        Ok(())
    }

    pub async fn remove_groups_from_user(&self, user_id: i64, group_ids: &[i64]) -> RbacResult<()> {
        self.remove_groups_from_users(&[user_id], group_ids).await
    }

    pub async fn remove_groups_from_users(
        &self,
        user_ids: &[i64],
        group_ids: &[i64],
    ) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        let mut removed = 0;
        for user_id in dedup_ids(user_ids) {
            require_user(&mut tx, user_id).await?;
            removed += delete_items(&mut tx, USER_GROUPS, user_id, group_ids).await?;
        }
        tx.commit().await?;

        tracing::info!(target: "audit", users = user_ids.len(), removed, "Users removed from groups");
        Ok(())
    }

    pub async fn clear_user_groups(&self, user_id: i64) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        let removed = clear_items(&mut tx, USER_GROUPS, user_id).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, removed, "User groups cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;

    async fn group_ids(m: &Mutations, user_id: i64) -> Vec<i64> {
        let mut conn = m.pool().acquire().await.unwrap();
        let user = safe_user(&mut conn, user_id).await.unwrap();
        let mut ids: Vec<i64> = user.groups.iter().map(|g| g.group.id).collect();
        ids.sort();
        ids
    }

    fn sorted(mut ids: Vec<i64>) -> Vec<i64> {
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn add_is_additive_and_skips_unknown_groups() {
        let (db, m) = testing::engine().await;
        let user = testing::user(&db, "a@example.com").await;
        let a = testing::group(&db, "A").await;
        let b = testing::group(&db, "B").await;

        m.add_user_to_group(user, a).await.unwrap();
        m.add_user_to_groups(user, &[a, b, 777]).await.unwrap();
        assert_eq!(group_ids(&m, user).await, sorted(vec![a, b]));

        let err = m.add_user_to_group(404, a).await.unwrap_err();
        assert!(matches!(err, RbacError::NotFound { entity: Entity::User, .. }));
    }

    #[tokio::test]
    async fn bulk_add_and_remove() {
        let (db, m) = testing::engine().await;
        let first = testing::user(&db, "a@example.com").await;
        let second = testing::user(&db, "b@example.com").await;
        let a = testing::group(&db, "A").await;
        let b = testing::group(&db, "B").await;

        m.add_users_to_groups(&[first, second], &[a, b]).await.unwrap();
        assert_eq!(group_ids(&m, first).await, sorted(vec![a, b]));
        assert_eq!(group_ids(&m, second).await, sorted(vec![a, b]));

        m.remove_groups_from_users(&[first, second], &[a]).await.unwrap();
        assert_eq!(group_ids(&m, first).await, vec![b]);
        assert_eq!(group_ids(&m, second).await, vec![b]);

        m.remove_groups_from_user(first, &[]).await.unwrap();
        assert_eq!(group_ids(&m, first).await, vec![b]);
    }

    #[tokio::test]
    async fn sync_replaces_membership_on_both_sides() {
        let (db, m) = testing::engine().await;
        let first = testing::user(&db, "a@example.com").await;
        let second = testing::user(&db, "b@example.com").await;
        let a = testing::group(&db, "A").await;
        let b = testing::group(&db, "B").await;

        m.sync_groups_to_users(&[first, second], &[a]).await.unwrap();
        m.sync_groups_to_user(first, &[b]).await.unwrap();
        assert_eq!(group_ids(&m, first).await, vec![b]);
        assert_eq!(group_ids(&m, second).await, vec![a]);

        m.sync_users_to_group(a, &[first]).await.unwrap();
        assert_eq!(group_ids(&m, first).await, sorted(vec![a, b]));
        assert!(group_ids(&m, second).await.is_empty());

        m.clear_user_groups(first).await.unwrap();
        assert!(group_ids(&m, first).await.is_empty());
    }

    #[tokio::test]
    async fn failed_bulk_sync_rolls_back() {
        let (db, m) = testing::engine().await;
        let user = testing::user(&db, "a@example.com").await;
        let a = testing::group(&db, "A").await;
        m.add_user_to_group(user, a).await.unwrap();

        let err = m.sync_groups_to_users(&[user, 404], &[]).await.unwrap_err();
        assert!(matches!(err, RbacError::NotFound { .. }));
        assert_eq!(group_ids(&m, user).await, vec![a]);
    }
}
