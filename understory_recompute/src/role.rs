// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edge roles.

use alloc::borrow::Cow;
use core::fmt;

use smallvec::SmallVec;

/// What an input edge is used for by the consuming feature.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// The shape the feature modifies. A skipped feature passes its single
    /// target through unchanged.
    Target,
    /// A shape used to modify the target (boolean tool, sweep path, ...).
    Tool,
    /// A named pick slot.
    Named(Cow<'static, str>),
}

impl Role {
    /// A named role from a static string.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self::Named(Cow::Borrowed(name))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target => f.write_str("target"),
            Self::Tool => f.write_str("tool"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Sorted, duplicate-free set of roles carried by one edge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(SmallVec<[Role; 2]>);

impl RoleSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the set holds no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if `role` is in the set.
    #[must_use]
    pub fn contains(&self, role: &Role) -> bool {
        self.0.binary_search(role).is_ok()
    }

    /// Adds `role`; returns `false` if it was already present.
    pub fn insert(&mut self, role: Role) -> bool {
        match self.0.binary_search(&role) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, role);
                true
            }
        }
    }

    /// Removes `role`; returns `false` if it was not present.
    pub fn remove(&mut self, role: &Role) -> bool {
        match self.0.binary_search(role) {
            Ok(pos) => {
                self.0.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Adds every role of `other`; returns `true` if anything was added.
    pub fn merge(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for role in other.iter() {
            changed |= self.insert(role.clone());
        }
        changed
    }

    /// Roles in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> + '_ {
        self.0.iter()
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        let mut set = Self::new();
        set.insert(role);
        set
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = Self::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, role) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(role, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_accumulate_without_duplicates() {
        let mut roles = RoleSet::from(Role::Tool);
        assert!(roles.insert(Role::Target));
        assert!(!roles.insert(Role::Tool));
        assert!(roles.merge(&RoleSet::from([Role::named("profile"), Role::Target])));
        assert_eq!(roles.len(), 3);
        assert_eq!(alloc::format!("{roles}"), "target, tool, profile");
    }

    #[test]
    fn remove_reports_presence() {
        let mut roles = RoleSet::from([Role::Target, Role::Tool]);
        assert!(roles.remove(&Role::Tool));
        assert!(!roles.remove(&Role::Tool));
        assert!(roles.contains(&Role::Target));
        assert!(roles.remove(&Role::Target));
        assert!(roles.is_empty());
    }
}
