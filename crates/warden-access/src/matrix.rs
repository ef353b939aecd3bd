//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Role permission matrix.
//!
//! Joins each role's group assignment against the group and permission
//! catalogs, producing per role a map from uppercased group key to the granted
//! permission ids and keys. Dangling references never fail the build.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{Permission, PermissionGroup, Role};

/// Permissions granted to one role inside one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupGrants {
    /// Raw permission ids as assigned, including ids missing from the catalog.
    pub ids: BTreeSet<String>,
    /// Keys of the assigned permissions that resolved against the catalog.
    pub keys: BTreeSet<String>,
}

impl GroupGrants {
    fn merge(&mut self, other: GroupGrants) {
        self.ids.extend(other.ids);
        self.keys.extend(other.keys);
    }

    /// Whether the group grants the permission key.
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

/// Per-group grants for a single role, keyed by uppercased group key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleMatrix {
    groups: BTreeMap<String, GroupGrants>,
}

impl RoleMatrix {
    /// Grants for a group key. Keys are stored uppercased; callers normalize first.
    pub fn group(&self, key: &str) -> Option<&GroupGrants> {
        self.groups.get(key)
    }

    /// Whether any group grants the permission key.
    pub fn has_key_in_any_group(&self, key: &str) -> bool {
        self.groups.values().any(|grants| grants.has_key(key))
    }

    /// Iterate over `(group key, grants)` pairs in key order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &GroupGrants)> {
        self.groups.iter().map(|(key, grants)| (key.as_str(), grants))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn accumulate(&mut self, group_key: String, grants: GroupGrants) {
        self.groups.entry(group_key).or_default().merge(grants);
    }
}

/// Role id to [`RoleMatrix`] for one catalog snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionMatrix {
    roles: BTreeMap<String, RoleMatrix>,
}

impl PermissionMatrix {
    /// Build the matrix from normalized catalog maps.
    ///
    /// * A group id missing from `groups` falls back to its uppercased raw id.
    /// * Empty permission ids are skipped; ids missing from `permissions` are kept in
    ///   `ids` but contribute nothing to `keys`.
    /// * Distinct groups that share a key are merged rather than overwritten.
    pub fn build(
        roles: &IndexMap<String, Role>,
        groups: &IndexMap<String, PermissionGroup>,
        permissions: &IndexMap<String, Permission>,
    ) -> Self {
        let mut matrix = Self::default();
        for (role_id, role) in roles {
            let mut role_matrix = RoleMatrix::default();
            for (group_id, permission_ids) in &role.permissions {
                if group_id.is_empty() {
                    debug!(role = %role_id, "skipping assignment with empty group id");
                    continue;
                }
                let group_key = groups
                    .get(group_id)
                    .map(|group| group.key.as_str())
                    .filter(|key| !key.is_empty())
                    .map(str::to_owned)
                    .unwrap_or_else(|| group_id.to_uppercase());

                let mut grants = GroupGrants::default();
                for permission_id in permission_ids.iter().filter(|id| !id.is_empty()) {
                    grants.ids.insert(permission_id.clone());
                    match resolve_key(permissions, permission_id) {
                        Some(key) => {
                            grants.keys.insert(key.to_owned());
                        }
                        None => {
                            debug!(
                                role = %role_id,
                                group = %group_key,
                                permission = %permission_id,
                                "permission id not in catalog; excluded from keys"
                            );
                        }
                    }
                }
                role_matrix.accumulate(group_key, grants);
            }
            matrix.roles.insert(role_id.clone(), role_matrix);
        }
        debug!(
            roles = matrix.roles.len(),
            groups = groups.len(),
            permissions = permissions.len(),
            "permission matrix built"
        );
        matrix
    }

    /// Matrix for a role, if the role is part of the snapshot.
    pub fn role(&self, role_id: &str) -> Option<&RoleMatrix> {
        self.roles.get(role_id)
    }

    /// Iterate over `(role id, matrix)` pairs in id order.
    pub fn roles(&self) -> impl Iterator<Item = (&str, &RoleMatrix)> {
        self.roles.iter().map(|(id, matrix)| (id.as_str(), matrix))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

fn resolve_key<'a>(permissions: &'a IndexMap<String, Permission>, id: &str) -> Option<&'a str> {
    let permission = permissions.get(id)?;
    [permission.key.as_str(), permission.name.as_str()]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
}
