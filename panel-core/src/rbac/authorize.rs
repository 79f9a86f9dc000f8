//! Authorization predicates
//!
//! Every check is a total boolean function over an already-loaded view.
//! Rules, in order:
//! 1. root users pass
//! 2. feature disabled -> pass
//! 3. an empty request list fails
//!
//! Permission arguments may be bare slugs, prefixed names or catalog entries;
//! they are normalized with the configured prefix before comparison.

use shared::models::{FullUser, SafeRole, SafeUser, User};

use super::catalog::GranularPermission;
use crate::config::GranularConfig;
use crate::error::{RbacError, RbacResult};

/// One permission or a list, for [`Authorizer::can`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requested {
    One(String),
    All(Vec<String>),
}

impl From<&str> for Requested {
    fn from(name: &str) -> Self {
        Requested::One(name.to_string())
    }
}

impl From<String> for Requested {
    fn from(name: String) -> Self {
        Requested::One(name)
    }
}

impl From<GranularPermission> for Requested {
    fn from(p: GranularPermission) -> Self {
        Requested::One(p.slug().to_string())
    }
}

impl<S: AsRef<str>> From<&[S]> for Requested {
    fn from(names: &[S]) -> Self {
        Requested::All(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Requested {
    fn from(names: [S; N]) -> Self {
        Requested::All(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Requested {
    fn from(names: Vec<S>) -> Self {
        Requested::All(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

/// Role-bearing view (full or safe)
pub trait RoleHolder {
    fn identity(&self) -> &User;
    fn direct_role_ids(&self) -> Vec<i64>;
    fn all_role_ids(&self) -> Vec<i64>;
}

impl RoleHolder for FullUser {
    fn identity(&self) -> &User {
        &self.user
    }

    fn direct_role_ids(&self) -> Vec<i64> {
        self.direct_roles.iter().map(|r| r.role.id).collect()
    }

    fn all_role_ids(&self) -> Vec<i64> {
        self.all_roles.iter().map(|r| r.role.id).collect()
    }
}

impl RoleHolder for SafeUser {
    fn identity(&self) -> &User {
        &self.user
    }

    fn direct_role_ids(&self) -> Vec<i64> {
        role_ids(&self.direct_roles)
    }

    fn all_role_ids(&self) -> Vec<i64> {
        role_ids(&self.all_roles)
    }
}

fn role_ids(roles: &[SafeRole]) -> Vec<i64> {
    roles.iter().map(|r| r.role.id).collect()
}

/// Predicate set bound to one immutable configuration
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    config: GranularConfig,
}

impl Authorizer {
    pub fn new(config: GranularConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GranularConfig {
        &self.config
    }

    fn bypass(&self, user: &User) -> bool {
        user.root || !self.config.enabled
    }

    fn holds(&self, granted: &[shared::models::Permission], name: &str) -> bool {
        let wanted = self.config.normalize(name);
        granted.iter().any(|p| p.name == wanted)
    }

    /// All requested permissions, through any path. A single permission
    /// behaves like [`Self::has_permission`]; an empty list is false.
    pub fn can(&self, user: &FullUser, requested: impl Into<Requested>) -> bool {
        match requested.into() {
            Requested::One(name) => self.has_permission(user, &name),
            Requested::All(names) => self.has_all_permissions(user, &names),
        }
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, user: &FullUser, names: &[S]) -> bool {
        if self.bypass(&user.user) {
            return true;
        }
        !names.is_empty()
            && names
                .iter()
                .all(|n| self.holds(&user.all_permissions, n.as_ref()))
    }

    pub fn has_permission(&self, user: &FullUser, name: impl AsRef<str>) -> bool {
        self.bypass(&user.user) || self.holds(&user.all_permissions, name.as_ref())
    }

    pub fn has_direct_permission(&self, user: &FullUser, name: impl AsRef<str>) -> bool {
        self.bypass(&user.user) || self.holds(&user.direct_permissions, name.as_ref())
    }

    /// At least one of `names`, through any path
    pub fn has_any_permissions<S: AsRef<str>>(&self, user: &FullUser, names: &[S]) -> bool {
        if self.bypass(&user.user) {
            return true;
        }
        names
            .iter()
            .any(|n| self.holds(&user.all_permissions, n.as_ref()))
    }

    pub fn has_all_direct_permissions<S: AsRef<str>>(&self, user: &FullUser, names: &[S]) -> bool {
        if self.bypass(&user.user) {
            return true;
        }
        !names.is_empty()
            && names
                .iter()
                .all(|n| self.holds(&user.direct_permissions, n.as_ref()))
    }

    pub fn has_any_direct_permissions<S: AsRef<str>>(&self, user: &FullUser, names: &[S]) -> bool {
        if self.bypass(&user.user) {
            return true;
        }
        names
            .iter()
            .any(|n| self.holds(&user.direct_permissions, n.as_ref()))
    }

    pub fn has_role(&self, user: &impl RoleHolder, role_id: i64) -> bool {
        self.bypass(user.identity()) || user.all_role_ids().contains(&role_id)
    }

    pub fn has_direct_role(&self, user: &impl RoleHolder, role_id: i64) -> bool {
        self.bypass(user.identity()) || user.direct_role_ids().contains(&role_id)
    }

    pub fn has_all_roles(&self, user: &impl RoleHolder, role_ids: &[i64]) -> bool {
        if self.bypass(user.identity()) {
            return true;
        }
        let held = user.all_role_ids();
        !role_ids.is_empty() && role_ids.iter().all(|id| held.contains(id))
    }

    pub fn has_all_direct_roles(&self, user: &impl RoleHolder, role_ids: &[i64]) -> bool {
        if self.bypass(user.identity()) {
            return true;
        }
        let held = user.direct_role_ids();
        !role_ids.is_empty() && role_ids.iter().all(|id| held.contains(id))
    }

    pub fn has_any_roles(&self, user: &impl RoleHolder, role_ids: &[i64]) -> bool {
        if self.bypass(user.identity()) {
            return true;
        }
        let held = user.all_role_ids();
        role_ids.iter().any(|id| held.contains(id))
    }

    pub fn has_any_direct_roles(&self, user: &impl RoleHolder, role_ids: &[i64]) -> bool {
        if self.bypass(user.identity()) {
            return true;
        }
        let held = user.direct_role_ids();
        role_ids.iter().any(|id| held.contains(id))
    }

    /// `can`, or `Forbidden` naming what was missing
    pub fn require(&self, user: &FullUser, requested: impl Into<Requested>) -> RbacResult<()> {
        let requested = requested.into();
        if self.can(user, requested.clone()) {
            return Ok(());
        }
        let wanted = match requested {
            Requested::One(name) => name,
            Requested::All(names) => names.join(", "),
        };
        tracing::warn!(user_id = user.user.id, permissions = %wanted, "Permission denied");
        Err(RbacError::Forbidden(wanted))
    }
}

// Group membership helpers. Not authorization checks: no root or flag bypass.

pub fn in_group(user: &SafeUser, group_id: i64) -> bool {
    user.groups.iter().any(|g| g.group.id == group_id)
}

pub fn in_all_groups(user: &SafeUser, group_ids: &[i64]) -> bool {
    !group_ids.is_empty() && group_ids.iter().all(|id| in_group(user, *id))
}

pub fn in_any_group(user: &SafeUser, group_ids: &[i64]) -> bool {
    group_ids.iter().any(|id| in_group(user, *id))
}
