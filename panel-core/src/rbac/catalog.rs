//! Permission catalog
//!
//! The fixed set of capabilities callers may check. Slugs are stored with the
//! configured prefix (`<prefix>.<slug>`). Adding or renaming an entry needs a
//! reseed so permission rows and the built-in roles follow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GranularPermission {
    // Own account
    ChangeOwnPassword,
    ChangeOwnEmailAddress,
    ChangeOwnUserDetails,
    DeleteOwnAccount,
    // Other users
    CreateNewUser,
    UpdateOtherUser,
    ReadListOtherUsers,
    DeleteOtherUser,
    // Groups
    CreateUserGroup,
    UpdateUserGroupDetails,
    ReadListUserGroups,
    DeleteUserGroup,
    // Relationship management
    ChangeUserPermissions,
    ChangeRolePermissions,
    ChangeUserGroupPermissions,
    ChangeUserRoles,
    ChangeUserGroupRoles,
    AddRemoveUserGroupMembers,
    // Roles
    CreateRole,
    DeleteRole,
    UpdateRoleDetails,
    ReadListRoles,
    ReadListPermissions,
}

use GranularPermission::*;

/// Every catalog entry, in catalog order
pub const ALL_PERMISSIONS: &[GranularPermission] = &[
    ChangeOwnPassword,
    ChangeOwnEmailAddress,
    ChangeOwnUserDetails,
    DeleteOwnAccount,
    CreateNewUser,
    UpdateOtherUser,
    ReadListOtherUsers,
    DeleteOtherUser,
    CreateUserGroup,
    UpdateUserGroupDetails,
    ReadListUserGroups,
    DeleteUserGroup,
    ChangeUserPermissions,
    ChangeRolePermissions,
    ChangeUserGroupPermissions,
    ChangeUserRoles,
    ChangeUserGroupRoles,
    AddRemoveUserGroupMembers,
    CreateRole,
    DeleteRole,
    UpdateRoleDetails,
    ReadListRoles,
    ReadListPermissions,
];

/// Moderators manage users and groups but not role definitions
pub const MODERATOR_PERMISSIONS: &[GranularPermission] = &[
    CreateNewUser,
    UpdateOtherUser,
    ReadListOtherUsers,
    DeleteOtherUser,
    CreateUserGroup,
    UpdateUserGroupDetails,
    ReadListUserGroups,
    DeleteUserGroup,
    ChangeUserPermissions,
    ChangeUserGroupPermissions,
    ChangeUserRoles,
    ChangeUserGroupRoles,
    AddRemoveUserGroupMembers,
    ReadListRoles,
    ReadListPermissions,
];

/// Self-service only
pub const USER_PERMISSIONS: &[GranularPermission] = &[
    ChangeOwnPassword,
    ChangeOwnEmailAddress,
    ChangeOwnUserDetails,
    DeleteOwnAccount,
];

pub const ADMINISTRATOR_ROLE: &str = "Administrator";
pub const MODERATOR_ROLE: &str = "Moderator";
pub const USER_ROLE: &str = "User";

/// Built-in role definition used by the seeder
#[derive(Debug, Clone, Copy)]
pub struct BuiltinRole {
    pub name: &'static str,
    pub description: &'static str,
}

pub const BUILTIN_ROLES: &[BuiltinRole] = &[
    BuiltinRole {
        name: ADMINISTRATOR_ROLE,
        description: "Is a god.",
    },
    BuiltinRole {
        name: MODERATOR_ROLE,
        description: "Can manage users, groups and their roles and permissions, but cannot create roles or manage their permissions.",
    },
    BuiltinRole {
        name: USER_ROLE,
        description: "A regular user. Can manage their own account.",
    },
];

/// Default permission set for a built-in role name
pub fn default_permissions(role_name: &str) -> Vec<GranularPermission> {
    match role_name {
        ADMINISTRATOR_ROLE => ALL_PERMISSIONS.to_vec(),
        MODERATOR_ROLE => MODERATOR_PERMISSIONS
            .iter()
            .chain(USER_PERMISSIONS)
            .copied()
            .collect(),
        USER_ROLE => USER_PERMISSIONS.to_vec(),
        _ => vec![],
    }
}

impl GranularPermission {
    /// Unprefixed kebab-case identifier
    pub fn slug(self) -> &'static str {
        match self {
            ChangeOwnPassword => "change-own-password",
            ChangeOwnEmailAddress => "change-own-email-address",
            ChangeOwnUserDetails => "change-own-user-details",
            DeleteOwnAccount => "delete-own-account",
            CreateNewUser => "create-new-user",
            UpdateOtherUser => "update-other-user",
            ReadListOtherUsers => "read-list-other-users",
            DeleteOtherUser => "delete-other-user",
            CreateUserGroup => "create-user-group",
            UpdateUserGroupDetails => "update-user-group-details",
            ReadListUserGroups => "read-list-user-groups",
            DeleteUserGroup => "delete-user-group",
            ChangeUserPermissions => "change-user-permissions",
            ChangeRolePermissions => "change-role-permissions",
            ChangeUserGroupPermissions => "change-user-group-permissions",
            ChangeUserRoles => "change-user-roles",
            ChangeUserGroupRoles => "change-user-group-roles",
            AddRemoveUserGroupMembers => "add-remove-user-group-members",
            CreateRole => "create-role",
            DeleteRole => "delete-role",
            UpdateRoleDetails => "update-role-details",
            ReadListRoles => "read-list-roles",
            ReadListPermissions => "read-list-permissions",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ChangeOwnPassword => "Change own password",
            ChangeOwnEmailAddress => "Change own email address",
            ChangeOwnUserDetails => "Change own user details",
            DeleteOwnAccount => "Delete own account",
            CreateNewUser => "Create new users",
            UpdateOtherUser => "Update other users",
            ReadListOtherUsers => "List other users",
            DeleteOtherUser => "Delete other users",
            CreateUserGroup => "Create user groups",
            UpdateUserGroupDetails => "Update user group details",
            ReadListUserGroups => "List user groups",
            DeleteUserGroup => "Delete user groups",
            ChangeUserPermissions => "Change user permissions",
            ChangeRolePermissions => "Change role permissions",
            ChangeUserGroupPermissions => "Change user group permissions",
            ChangeUserRoles => "Change user roles",
            ChangeUserGroupRoles => "Change user group roles",
            AddRemoveUserGroupMembers => "Add or remove user group members",
            CreateRole => "Create roles",
            DeleteRole => "Delete roles",
            UpdateRoleDetails => "Update role details",
            ReadListRoles => "List roles",
            ReadListPermissions => "List permissions",
        }
    }
}

impl AsRef<str> for GranularPermission {
    fn as_ref(&self) -> &str {
        self.slug()
    }
}

impl fmt::Display for GranularPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for GranularPermission {
    type Err = UnknownPermission;

    /// Accepts the bare slug or any `<prefix>.<slug>` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slug = s.rsplit('.').next().unwrap_or(s);
        ALL_PERMISSIONS
            .iter()
            .copied()
            .find(|p| p.slug() == slug)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_unique_slugs() {
        let slugs: HashSet<_> = ALL_PERMISSIONS.iter().map(|p| p.slug()).collect();
        assert_eq!(slugs.len(), ALL_PERMISSIONS.len());
        assert_eq!(ALL_PERMISSIONS.len(), 23);
    }

    #[test]
    fn serde_uses_slug() {
        let json = serde_json::to_string(&AddRemoveUserGroupMembers).unwrap();
        assert_eq!(json, "\"add-remove-user-group-members\"");
    }

    #[test]
    fn parse_accepts_prefixed_names() {
        assert_eq!("create-role".parse::<GranularPermission>().unwrap(), CreateRole);
        assert_eq!(
            "granular-perms.create-role".parse::<GranularPermission>().unwrap(),
            CreateRole
        );
        assert!("launch-rockets".parse::<GranularPermission>().is_err());
    }

    #[test]
    fn moderator_cannot_manage_role_definitions() {
        let moderator = default_permissions(MODERATOR_ROLE);
        assert!(!moderator.contains(&CreateRole));
        assert!(!moderator.contains(&ChangeRolePermissions));
        assert!(moderator.contains(&ChangeOwnPassword));
        assert_eq!(moderator.len(), MODERATOR_PERMISSIONS.len() + USER_PERMISSIONS.len());
    }

    #[test]
    fn administrator_gets_everything() {
        assert_eq!(default_permissions(ADMINISTRATOR_ROLE).len(), ALL_PERMISSIONS.len());
        assert!(default_permissions("Nobody").is_empty());
    }
}
