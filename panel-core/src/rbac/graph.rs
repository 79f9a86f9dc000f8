//! Typed entity graph
//!
//! The query layer fetches flat rows and assembles them here. Assembly is the
//! single place where soft-deleted roles, groups and member users are dropped
//! ([`is_visible`]); everything downstream (transform, predicates) can trust
//! that every node it sees is live.

use std::collections::HashMap;

use shared::models::{Group, MinUser, Permission, Role, RoleGroup, User, UserConfig};

/// How much of the relational closure a query hydrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fidelity {
    /// Everything including permission payloads
    #[default]
    Full,
    /// Roles and groups, no permissions
    Safe,
    /// Entity and its 1:1 config only
    Min,
}

/// Anything carrying a soft-delete flag
pub trait SoftDelete {
    fn is_deleted(&self) -> bool;
}

impl SoftDelete for User {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl SoftDelete for Role {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl SoftDelete for Group {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl SoftDelete for RoleGroup {
    fn is_deleted(&self) -> bool {
        self.group.deleted
    }
}

impl SoftDelete for MinUser {
    fn is_deleted(&self) -> bool {
        self.user.deleted
    }
}

pub fn is_visible<T: SoftDelete>(entity: &T) -> bool {
    !entity.is_deleted()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleNode {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub group: Group,
    pub permissions: Vec<Permission>,
    /// Visible roles attached to the group
    pub roles: Vec<RoleNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNode {
    pub fidelity: Fidelity,
    pub user: User,
    pub config: Option<UserConfig>,
    pub direct_permissions: Vec<Permission>,
    pub direct_roles: Vec<RoleNode>,
    pub groups: Vec<GroupNode>,
}

/// Top-level role with its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGraph {
    pub fidelity: Fidelity,
    pub node: RoleNode,
    pub users: Vec<MinUser>,
    /// Group permissions are only filled at `Full`
    pub groups: Vec<RoleGroup>,
}

/// Top-level group with its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupGraph {
    pub fidelity: Fidelity,
    pub node: GroupNode,
    pub users: Vec<MinUser>,
}

/// Adjacency lists shared by every node assembled from one fetch
#[derive(Debug, Default)]
pub struct Edges {
    pub role_permissions: HashMap<i64, Vec<Permission>>,
    pub group_permissions: HashMap<i64, Vec<Permission>>,
    pub group_roles: HashMap<i64, Vec<Role>>,
}

impl Edges {
    pub fn add_role_permission(&mut self, role_id: i64, permission: Permission) {
        self.role_permissions.entry(role_id).or_default().push(permission);
    }

    pub fn add_group_permission(&mut self, group_id: i64, permission: Permission) {
        self.group_permissions
            .entry(group_id)
            .or_default()
            .push(permission);
    }

    pub fn add_group_role(&mut self, group_id: i64, role: Role) {
        self.group_roles.entry(group_id).or_default().push(role);
    }

    /// `None` when the role is soft-deleted
    pub fn role_node(&self, role: Role) -> Option<RoleNode> {
        if !is_visible(&role) {
            return None;
        }
        let permissions = self
            .role_permissions
            .get(&role.id)
            .cloned()
            .unwrap_or_default();
        Some(RoleNode { role, permissions })
    }

    /// `None` when the group is soft-deleted. Deleted group roles are dropped.
    pub fn group_node(&self, group: Group) -> Option<GroupNode> {
        is_visible(&group).then(|| self.attach_group(group))
    }

    fn attach_group(&self, group: Group) -> GroupNode {
        let permissions = self
            .group_permissions
            .get(&group.id)
            .cloned()
            .unwrap_or_default();
        let roles = self
            .group_roles
            .get(&group.id)
            .into_iter()
            .flatten()
            .filter_map(|role| self.role_node(role.clone()))
            .collect();
        GroupNode {
            group,
            permissions,
            roles,
        }
    }
}

impl UserNode {
    /// User with nothing but its config (Min fidelity)
    pub fn bare(user: User, config: Option<UserConfig>) -> Self {
        Self {
            fidelity: Fidelity::Min,
            user,
            config,
            direct_permissions: Vec::new(),
            direct_roles: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn assemble(
        fidelity: Fidelity,
        user: User,
        config: Option<UserConfig>,
        direct_permissions: Vec<Permission>,
        direct_roles: Vec<Role>,
        groups: Vec<Group>,
        edges: &Edges,
    ) -> Self {
        Self {
            fidelity,
            user,
            config,
            direct_permissions,
            direct_roles: direct_roles
                .into_iter()
                .filter_map(|r| edges.role_node(r))
                .collect(),
            groups: groups
                .into_iter()
                .filter_map(|g| edges.group_node(g))
                .collect(),
        }
    }
}

impl RoleGraph {
    pub fn assemble(
        fidelity: Fidelity,
        role: Role,
        permissions: Vec<Permission>,
        users: Vec<MinUser>,
        groups: Vec<RoleGroup>,
    ) -> Self {
        Self {
            fidelity,
            node: RoleNode { role, permissions },
            users: users.into_iter().filter(is_visible).collect(),
            groups: groups.into_iter().filter(is_visible).collect(),
        }
    }
}

impl GroupGraph {
    pub fn assemble(
        fidelity: Fidelity,
        group: Group,
        users: Vec<MinUser>,
        edges: &Edges,
    ) -> Self {
        Self {
            fidelity,
            node: edges.attach_group(group),
            users: users.into_iter().filter(is_visible).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn perm(slug: &str) -> Permission {
        Permission {
            name: format!("granular-perms.{slug}"),
            description: None,
        }
    }

    pub fn role(id: i64, deleted: bool) -> Role {
        Role {
            id,
            name: format!("role-{id}"),
            description: None,
            deleted,
            protected: false,
        }
    }

    pub fn group(id: i64, deleted: bool) -> Group {
        Group {
            id,
            name: format!("group-{id}"),
            description: None,
            deleted,
        }
    }

    pub fn user(id: i64, root: bool) -> User {
        User {
            id,
            email: format!("user{id}@example.com"),
            verified: true,
            deleted: false,
            root,
            created_at: 0,
        }
    }
}
