//! Graph -> view model reducers
//!
//! Pure functions, no I/O and no authorization. Visibility has already been
//! applied during graph assembly, so nothing here looks at `deleted`.

use std::collections::HashSet;

use serde::Serialize;
use shared::models::{
    FullGroup, FullRole, FullUser, MinUser, Permission, Role, SafeGroup, SafeRole, SafeUser,
};

use super::graph::{Fidelity, GroupGraph, GroupNode, RoleGraph, RoleNode, UserNode};

/// Effective permissions: direct, then role, then group-direct, then
/// group-role. First occurrence of each name wins.
pub fn all_permissions(node: &UserNode) -> Vec<Permission> {
    let role_perms = node.direct_roles.iter().flat_map(|r| &r.permissions);
    let group_perms = node.groups.iter().flat_map(|g| {
        g.permissions
            .iter()
            .chain(g.roles.iter().flat_map(|r| &r.permissions))
    });

    let mut seen = HashSet::new();
    node.direct_permissions
        .iter()
        .chain(role_perms)
        .chain(group_perms)
        .filter(|p| seen.insert(p.name.as_str()))
        .cloned()
        .collect()
}

/// Effective roles: direct roles, then each group's roles, unique by id
pub fn all_roles(node: &UserNode) -> Vec<&RoleNode> {
    let group_roles = node.groups.iter().flat_map(|g| &g.roles);

    let mut seen = HashSet::new();
    node.direct_roles
        .iter()
        .chain(group_roles)
        .filter(|r| seen.insert(r.role.id))
        .collect()
}

fn nested_full_role(node: &RoleNode) -> FullRole {
    FullRole {
        role: node.role.clone(),
        permissions: node.permissions.clone(),
        users: Vec::new(),
        groups: Vec::new(),
    }
}

fn nested_safe_role(role: &Role) -> SafeRole {
    SafeRole {
        role: role.clone(),
        users: Vec::new(),
        groups: Vec::new(),
    }
}

fn nested_full_group(node: &GroupNode) -> FullGroup {
    FullGroup {
        group: node.group.clone(),
        permissions: node.permissions.clone(),
        roles: node.roles.iter().map(nested_full_role).collect(),
        users: Vec::new(),
    }
}

fn nested_safe_group(node: &GroupNode) -> SafeGroup {
    SafeGroup {
        group: node.group.clone(),
        roles: node.roles.iter().map(|r| r.role.clone()).collect(),
        users: Vec::new(),
    }
}

pub fn to_full_user(node: &UserNode) -> FullUser {
    FullUser {
        user: node.user.clone(),
        config: node.config.clone(),
        direct_permissions: node.direct_permissions.clone(),
        direct_roles: node.direct_roles.iter().map(nested_full_role).collect(),
        groups: node.groups.iter().map(nested_full_group).collect(),
        all_permissions: all_permissions(node),
        all_roles: all_roles(node).into_iter().map(nested_full_role).collect(),
    }
}

pub fn to_safe_user(node: &UserNode) -> SafeUser {
    SafeUser {
        user: node.user.clone(),
        config: node.config.clone(),
        direct_roles: node
            .direct_roles
            .iter()
            .map(|r| nested_safe_role(&r.role))
            .collect(),
        groups: node.groups.iter().map(nested_safe_group).collect(),
        all_roles: all_roles(node)
            .into_iter()
            .map(|r| nested_safe_role(&r.role))
            .collect(),
    }
}

pub fn to_min_user(node: &UserNode) -> MinUser {
    MinUser {
        user: node.user.clone(),
        config: node.config.clone(),
    }
}

pub fn to_full_role(graph: &RoleGraph) -> FullRole {
    FullRole {
        role: graph.node.role.clone(),
        permissions: graph.node.permissions.clone(),
        users: graph.users.clone(),
        groups: graph.groups.clone(),
    }
}

pub fn to_safe_role(graph: &RoleGraph) -> SafeRole {
    SafeRole {
        role: graph.node.role.clone(),
        users: graph.users.clone(),
        groups: graph.groups.iter().map(|g| g.group.clone()).collect(),
    }
}

pub fn to_full_group(graph: &GroupGraph) -> FullGroup {
    FullGroup {
        users: graph.users.clone(),
        ..nested_full_group(&graph.node)
    }
}

pub fn to_safe_group(graph: &GroupGraph) -> SafeGroup {
    SafeGroup {
        users: graph.users.clone(),
        ..nested_safe_group(&graph.node)
    }
}

/// User view in whatever shape its graph was loaded at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserView {
    Full(FullUser),
    Safe(SafeUser),
    Min(MinUser),
}

pub fn user_view(node: &UserNode) -> UserView {
    match node.fidelity {
        Fidelity::Full => UserView::Full(to_full_user(node)),
        Fidelity::Safe => UserView::Safe(to_safe_user(node)),
        Fidelity::Min => UserView::Min(to_min_user(node)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RoleView {
    Full(FullRole),
    Safe(SafeRole),
}

/// Min role graphs carry no members and come out as `Safe`
pub fn role_view(graph: &RoleGraph) -> RoleView {
    match graph.fidelity {
        Fidelity::Full => RoleView::Full(to_full_role(graph)),
        Fidelity::Safe | Fidelity::Min => RoleView::Safe(to_safe_role(graph)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GroupView {
    Full(FullGroup),
    Safe(SafeGroup),
}

pub fn group_view(graph: &GroupGraph) -> GroupView {
    match graph.fidelity {
        Fidelity::Full => GroupView::Full(to_full_group(graph)),
        Fidelity::Safe | Fidelity::Min => GroupView::Safe(to_safe_group(graph)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::graph::Edges;
    use crate::rbac::graph::fixtures::*;

    fn names(perms: &[Permission]) -> Vec<String> {
        let mut v: Vec<String> = perms.iter().map(|p| p.name.clone()).collect();
        v.sort();
        v
    }

    /// U: direct p1; R1 {p2,p3}; G1 { p4, R2 {p5} }
    fn scenario(r1_deleted: bool) -> UserNode {
        let mut edges = Edges::default();
        edges.add_role_permission(1, perm("p2"));
        edges.add_role_permission(1, perm("p3"));
        edges.add_role_permission(2, perm("p5"));
        edges.add_group_permission(10, perm("p4"));
        edges.add_group_role(10, role(2, false));

        UserNode::assemble(
            Fidelity::Full,
            user(100, false),
            None,
            vec![perm("p1")],
            vec![role(1, r1_deleted)],
            vec![group(10, false)],
            &edges,
        )
    }

    #[test]
    fn unions_every_granting_path() {
        let node = scenario(false);
        assert_eq!(
            names(&all_permissions(&node)),
            names(&["p1", "p2", "p3", "p4", "p5"].map(perm))
        );
        let roles: Vec<i64> = all_roles(&node).iter().map(|r| r.role.id).collect();
        assert_eq!(roles, vec![1, 2]);
    }

    #[test]
    fn deleted_direct_role_contributes_nothing() {
        let node = scenario(true);
        assert_eq!(
            names(&all_permissions(&node)),
            names(&["p1", "p4", "p5"].map(perm))
        );
        let view = to_full_user(&node);
        assert!(view.all_roles.iter().all(|r| r.role.id != 1));
        assert!(view.direct_roles.is_empty());
    }

    #[test]
    fn duplicates_across_paths_collapse_to_first() {
        let mut edges = Edges::default();
        let described = Permission {
            name: "granular-perms.shared".into(),
            description: Some("from role".into()),
        };
        edges.add_role_permission(1, described);
        edges.add_group_permission(10, perm("shared"));
        edges.add_group_role(10, role(1, false));

        let node = UserNode::assemble(
            Fidelity::Full,
            user(1, false),
            None,
            vec![],
            vec![role(1, false)],
            vec![group(10, false)],
            &edges,
        );
        let all = all_permissions(&node);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description.as_deref(), Some("from role"));

        // R1 reachable directly and through G10
        assert_eq!(all_roles(&node).len(), 1);
    }

    #[test]
    fn empty_user_has_empty_collections() {
        let node = UserNode::assemble(
            Fidelity::Full,
            user(1, false),
            None,
            vec![],
            vec![],
            vec![],
            &Edges::default(),
        );
        let view = to_full_user(&node);
        assert!(view.all_permissions.is_empty());
        assert!(view.all_roles.is_empty());
        assert!(view.groups.is_empty());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["all_permissions"].is_array());
    }

    #[test]
    fn safe_view_carries_no_permissions() {
        let node = scenario(false);
        let safe = to_safe_user(&node);
        assert_eq!(safe.groups[0].roles.len(), 1);
        let json = serde_json::to_value(&safe).unwrap();
        assert!(json.get("all_permissions").is_none());
        assert!(json["groups"][0].get("permissions").is_none());
    }

    #[test]
    fn view_shape_follows_fidelity() {
        let node = UserNode::bare(user(1, false), None);
        assert!(matches!(user_view(&node), UserView::Min(_)));
        assert!(matches!(user_view(&scenario(false)), UserView::Full(_)));
    }
}
