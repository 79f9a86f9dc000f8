//! Permission view models
//!
//! Denormalized shapes produced by the transform layer. Entity rows are
//! flattened into the view so the serialized form reads like the row plus its
//! derived collections. Nested roles and groups carry empty `users`/`groups`
//! collections; only top-level role/group views fill them.
//!
//! Collections are always present (possibly empty), never `null`.

use serde::{Deserialize, Serialize};

use super::{Group, Permission, Role, User, UserConfig};

/// Identity + profile only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinUser {
    #[serde(flatten)]
    pub user: User,
    pub config: Option<UserConfig>,
}

/// Group listed under a role, with the group's own direct permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGroup {
    #[serde(flatten)]
    pub group: Group,
    pub permissions: Vec<Permission>,
}

/// Role with its permission payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullRole {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub users: Vec<MinUser>,
    pub groups: Vec<RoleGroup>,
}

/// Role identity without permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeRole {
    #[serde(flatten)]
    pub role: Role,
    pub users: Vec<MinUser>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullGroup {
    #[serde(flatten)]
    pub group: Group,
    /// Direct group permissions (not including role permissions)
    pub permissions: Vec<Permission>,
    pub roles: Vec<FullRole>,
    pub users: Vec<MinUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeGroup {
    #[serde(flatten)]
    pub group: Group,
    pub roles: Vec<Role>,
    pub users: Vec<MinUser>,
}

/// User with every granting path and the effective sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullUser {
    #[serde(flatten)]
    pub user: User,
    pub config: Option<UserConfig>,
    pub direct_permissions: Vec<Permission>,
    pub direct_roles: Vec<FullRole>,
    pub groups: Vec<FullGroup>,
    pub all_permissions: Vec<Permission>,
    pub all_roles: Vec<FullRole>,
}

/// User with role/group identities only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeUser {
    #[serde(flatten)]
    pub user: User,
    pub config: Option<UserConfig>,
    pub direct_roles: Vec<SafeRole>,
    pub groups: Vec<SafeGroup>,
    pub all_roles: Vec<SafeRole>,
}

/// Administrative listing: live and soft-deleted entities kept apart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub active: Vec<T>,
    pub deleted: Vec<T>,
}

impl<T> Listing<T> {
    /// Split items by a `deleted` accessor, preserving order
    pub fn partition(items: impl IntoIterator<Item = T>, deleted: impl Fn(&T) -> bool) -> Self {
        let (deleted, active) = items.into_iter().partition(|item| deleted(item));
        Self { active, deleted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: i64, deleted: bool) -> Role {
        Role {
            id,
            name: format!("role-{id}"),
            description: None,
            deleted,
            protected: false,
        }
    }

    #[test]
    fn listing_partitions_by_deleted_flag() {
        let listing = Listing::partition(
            vec![role(1, false), role(2, true), role(3, false)],
            |r| r.deleted,
        );
        assert_eq!(
            listing.active.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(listing.deleted.len(), 1);
        assert_eq!(listing.deleted[0].id, 2);
    }

    #[test]
    fn role_view_serializes_flat() {
        let view = SafeRole {
            role: role(7, false),
            users: vec![],
            groups: vec![],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "role-7");
        assert!(json["users"].as_array().unwrap().is_empty());
    }
}
