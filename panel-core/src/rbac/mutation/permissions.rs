//! Permission grants on users, roles and groups

use std::collections::HashSet;

use super::{
    GROUP_PERMISSIONS, Mutations, ROLE_PERMISSIONS, USER_PERMISSIONS, clear_items, delete_items,
    insert_items, replace_items, require_unprotected_role, require_user,
};
use crate::db;
use crate::error::{Entity, RbacError, RbacResult};
use crate::rbac::graph::Fidelity;
use crate::rbac::query;

impl Mutations {
    /// Grant permissions the user does not already hold through any path
    pub async fn assign_permissions_to_user<S: AsRef<str>>(
        &self,
        user_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;

        let user = query::full_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| RbacError::not_found(Entity::User, user_id))?;
        if permissions.is_empty() {
            return Ok(());
        }

        let held: HashSet<&str> = user
            .all_permissions
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        let missing: Vec<String> = self
            .config
            .normalize_all(permissions)
            .into_iter()
            .filter(|name| !held.contains(name.as_str()))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let inserted = insert_items(&mut tx, USER_PERMISSIONS, user_id, &missing).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, inserted, "Permissions assigned to user");
        Ok(())
    }

    /// Replace the user's direct permissions
    pub async fn sync_permissions_to_user<S: AsRef<str>>(
        &self,
        user_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let names = self.config.normalize_all(permissions);

        let mut tx = db::begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        let granted = replace_items(&mut tx, USER_PERMISSIONS, user_id, &names).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, granted, "User permissions synced");
        Ok(())
    }

    pub async fn remove_permissions_from_user<S: AsRef<str>>(
        &self,
        user_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let names = self.config.normalize_all(permissions);

        let mut tx = db::begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        let removed = delete_items(&mut tx, USER_PERMISSIONS, user_id, &names).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, removed, "Permissions removed from user");
        Ok(())
    }

    /// Drop every direct permission of the user
    pub async fn clear_user_permissions(&self, user_id: i64) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        require_user(&mut tx, user_id).await?;
        let removed = clear_items(&mut tx, USER_PERMISSIONS, user_id).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", user_id, removed, "User permissions cleared");
        Ok(())
    }

    /// Grant permissions to an unprotected role
    pub async fn assign_permissions_to_role<S: AsRef<str>>(
        &self,
        role_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;
        require_unprotected_role(&mut tx, role_id).await?;
        if permissions.is_empty() {
            return Ok(());
        }

        let held: HashSet<String> = query::role(&mut tx, role_id, Fidelity::Full)
            .await?
            .map(|graph| {
                graph
                    .node
                    .permissions
                    .into_iter()
                    .map(|p| p.name)
                    .collect()
            })
            .unwrap_or_default();
        let missing: Vec<String> = self
            .config
            .normalize_all(permissions)
            .into_iter()
            .filter(|name| !held.contains(name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let inserted = insert_items(&mut tx, ROLE_PERMISSIONS, role_id, &missing).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", role_id, inserted, "Permissions assigned to role");
        Ok(())
    }

    pub async fn sync_permissions_to_role<S: AsRef<str>>(
        &self,
        role_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let names = self.config.normalize_all(permissions);

        let mut tx = db::begin_write(&self.pool).await?;
        require_unprotected_role(&mut tx, role_id).await?;
        let granted = replace_items(&mut tx, ROLE_PERMISSIONS, role_id, &names).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", role_id, granted, "Role permissions synced");
        Ok(())
    }

    pub async fn remove_permissions_from_role<S: AsRef<str>>(
        &self,
        role_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let names = self.config.normalize_all(permissions);

        let mut tx = db::begin_write(&self.pool).await?;
        require_unprotected_role(&mut tx, role_id).await?;
        let removed = delete_items(&mut tx, ROLE_PERMISSIONS, role_id, &names).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", role_id, removed, "Permissions removed from role");
        Ok(())
    }

    /// Grant permissions the group does not already carry, directly or
    /// through one of its roles
    pub async fn assign_permissions_to_group<S: AsRef<str>>(
        &self,
        group_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let mut tx = db::begin_write(&self.pool).await?;

        db::groups::require(&mut *tx, group_id).await?;
        if permissions.is_empty() {
            return Ok(());
        }

        let mut held: HashSet<String> = HashSet::new();
        if let Some(graph) = query::group(&mut tx, group_id, Fidelity::Full).await? {
            let node = graph.node;
            held.extend(node.permissions.into_iter().map(|p| p.name));
            for role in node.roles {
                held.extend(role.permissions.into_iter().map(|p| p.name));
            }
        }

        let missing: Vec<String> = self
            .config
            .normalize_all(permissions)
            .into_iter()
            .filter(|name| !held.contains(name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let inserted = insert_items(&mut tx, GROUP_PERMISSIONS, group_id, &missing).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", group_id, inserted, "Permissions assigned to group");
        Ok(())
    }

    pub async fn sync_permissions_to_group<S: AsRef<str>>(
        &self,
        group_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let names = self.config.normalize_all(permissions);

        let mut tx = db::begin_write(&self.pool).await?;
        db::groups::require(&mut *tx, group_id).await?;
        let granted = replace_items(&mut tx, GROUP_PERMISSIONS, group_id, &names).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", group_id, granted, "Group permissions synced");
        Ok(())
    }

    pub async fn remove_permissions_from_group<S: AsRef<str>>(
        &self,
        group_id: i64,
        permissions: &[S],
    ) -> RbacResult<()> {
        let names = self.config.normalize_all(permissions);

        let mut tx = db::begin_write(&self.pool).await?;
        db::groups::require(&mut *tx, group_id).await?;
        let removed = delete_items(&mut tx, GROUP_PERMISSIONS, group_id, &names).await?;
        tx.commit().await?;

        tracing::info!(target: "audit", group_id, removed, "Permissions removed from group");
        Ok(())
    }
}
