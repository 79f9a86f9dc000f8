//! Role membership of users and groups

use std::collections::HashSet;

use super::{
    GROUP_ROLES, Mutations, ROLE_GROUPS, ROLE_USERS, USER_ROLES, clear_items, dedup_ids,
    delete_items, insert_items, replace_items, require_user,
};
use crate::db;
use crate::error::{Entity, RbacError, RbacResult};
use crate::rbac::graph::Fidelity;
use crate::rbac::query;

impl Mutations {
    /// Attach roles the user does not already have, directly or through a group
    pub async fn assign_roles_to_user(&self, user_id: i64, role_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;

        let user = query::full_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| RbacError::not_found(Entity::User, user_id))?;
        if role_ids.is_empty() {
            return Ok(());
        }

        let held: HashSet<i64> = user.all_roles.iter().map(|r| r.role.id).collect();
        let missing: Vec<i64> = dedup_ids(role_ids)
            .into_iter()
            .filter(|id| !held.contains(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let inserted = insert_items(&mut tx, USER_ROLES, user_id, &missing).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, inserted, "Roles assigned to user");
        Ok(())
    }

    pub async fn sync_roles_to_user(&self, user_id: i64, role_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        let attached = replace_items(&mut tx, USER_ROLES, user_id, &dedup_ids(role_ids)).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, attached, "User roles synced");
        Ok(())
    }

    pub async fn remove_roles_from_user(&self, user_id: i64, role_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        let removed = delete_items(&mut tx, USER_ROLES, user_id, role_ids).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, removed, "Roles removed from user");
        Ok(())
    }

    pub async fn clear_user_roles(&self, user_id: i64) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        let removed = clear_items(&mut tx, USER_ROLES, user_id).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, removed, "User roles cleared");
        Ok(())
    }

    /// Replace the direct members of a role
    pub async fn sync_users_to_role(&self, role_id: i64, user_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        db::roles::require(&mut *tx, role_id).await?;
        let attached = replace_items(&mut tx, ROLE_USERS, role_id, &dedup_ids(user_ids)).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", role_id, attached, "Role users synced");
        Ok(())
    }

    /// Attach roles the group does not already have
    pub async fn assign_roles_to_group(&self, group_id: i64, role_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;

        db::groups::require(&mut *tx, group_id).await?;
        if role_ids.is_empty() {
            return Ok(());
        }

        let held: HashSet<i64> = query::group(&mut tx, group_id, Fidelity::Safe)
            .await?
            .map(|graph| graph.node.roles.iter().map(|r| r.role.id).collect())
            .unwrap_or_default();
        let missing: Vec<i64> = dedup_ids(role_ids)
            .into_iter()
            .filter(|id| !held.contains(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let inserted = insert_items(&mut tx, GROUP_ROLES, group_id, &missing).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", group_id, inserted, "Roles assigned to group");
        Ok(())
    }

    pub async fn sync_roles_to_group(&self, group_id: i64, role_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        db::groups::require(&mut *tx, group_id).await?;
        let attached =
            replace_items(&mut tx, GROUP_ROLES, group_id, &dedup_ids(role_ids)).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", group_id, attached, "Group roles synced");
        Ok(())
    }

    pub async fn remove_roles_from_group(
        &self,
        group_id: i64,
        role_ids: &[i64],
    ) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        db::groups::require(&mut *tx, group_id).await?;
        let removed = delete_items(&mut tx, GROUP_ROLES, group_id, role_ids).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", group_id, removed, "Roles removed from group");
        Ok(())
    }

    /// Replace the set of groups carrying a role
    pub async fn sync_groups_to_role(&self, role_id: i64, group_ids: &[i64]) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        db::roles::require(&mut *tx, role_id).await?;
        let attached =
            replace_items(&mut tx, ROLE_GROUPS, role_id, &dedup_ids(group_ids)).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", role_id, attached, "Role groups synced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;
    use crate::rbac::transform;

    async fn direct_role_ids(m: &Mutations, user_id: i64) -> Vec<i64> {
        let mut conn = m.pool().acquire().await.unwrap();
        let user = query::full_user(&mut conn, user_id).await.unwrap().unwrap();
        let mut ids: Vec<i64> = user.direct_roles.iter().map(|r| r.role.id).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn assign_skips_roles_inherited_from_groups() {
        let (db, m) = testing::engine().await;
        let user = testing::user(&db, "a@example.com").await;
        let group = testing::group(&db, "Support").await;
        let via_group = testing::role(&db, "Helpdesk").await;
        let direct = testing::role(&db, "Editor").await;

        m.sync_roles_to_group(group, &[via_group]).await.unwrap();
        m.add_user_to_group(user, group).await.unwrap();
        m.assign_roles_to_user(user, &[via_group, direct, 999])
            .await
            .unwrap();

        assert_eq!(direct_role_ids(&m, user).await, vec![direct]);
    }

    #[tokio::test]
    async fn sync_remove_clear_user_roles() {
        let (db, m) = testing::engine().await;
        let user = testing::user(&db, "a@example.com").await;
        let a = testing::role(&db, "A").await;
        let b = testing::role(&db, "B").await;

        m.sync_roles_to_user(user, &[a, b, a]).await.unwrap();
        let mut both = vec![a, b];
        both.sort();
        assert_eq!(direct_role_ids(&m, user).await, both);

        m.remove_roles_from_user(user, &[a]).await.unwrap();
        assert_eq!(direct_role_ids(&m, user).await, vec![b]);

        m.clear_user_roles(user).await.unwrap();
        assert!(direct_role_ids(&m, user).await.is_empty());
    }

    #[tokio::test]
    async fn sync_users_to_role_replaces_members() {
        let (db, m) = testing::engine().await;
        let first = testing::user(&db, "a@example.com").await;
        let second = testing::user(&db, "b@example.com").await;
        let role = testing::role(&db, "Editor").await;

        m.sync_users_to_role(role, &[first]).await.unwrap();
        m.sync_users_to_role(role, &[second]).await.unwrap();

        let mut conn = db.pool.acquire().await.unwrap();
        let graph = query::role(&mut conn, role, Fidelity::Safe)
            .await
            .unwrap()
            .unwrap();
        let members: Vec<i64> = graph.users.iter().map(|u| u.user.id).collect();
        assert_eq!(members, vec![second]);
        drop(conn);

        let err = m.sync_users_to_role(404, &[first]).await.unwrap_err();
        assert!(matches!(err, RbacError::NotFound { entity: Entity::Role, .. }));
    }

    #[tokio::test]
    async fn group_roles_round_trip_through_both_sides() {
        let (db, m) = testing::engine().await;
        let group = testing::group(&db, "Support").await;
        let other = testing::group(&db, "Sales").await;
        let role = testing::role(&db, "Helpdesk").await;

        m.assign_roles_to_group(group, &[role]).await.unwrap();
        m.assign_roles_to_group(group, &[role]).await.unwrap();
        m.sync_groups_to_role(role, &[group, other]).await.unwrap();

        let mut conn = db.pool.acquire().await.unwrap();
        let graph = query::role(&mut conn, role, Fidelity::Safe)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transform::to_safe_role(&graph).groups.len(), 2);
        drop(conn);

        m.remove_roles_from_group(other, &[role]).await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let graph = query::role(&mut conn, role, Fidelity::Safe)
            .await
            .unwrap()
            .unwrap();
        let groups: Vec<i64> = graph.groups.iter().map(|g| g.group.id).collect();
        assert_eq!(groups, vec![group]);
    }
}
