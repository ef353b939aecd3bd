//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Editing buffer for a role's name and permission assignment.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::catalog::{PermissionGroup, Role};
use crate::gate::AccessGate;
use crate::requirement::Requirement;

/// Update sent back to the role store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleUpdate {
    pub id: String,
    pub name: String,
    pub permissions: IndexMap<String, Vec<String>>,
}

/// Pending edits to a single role.
///
/// Permission edits and resets are ignored unless the draft was opened with write access.
#[derive(Debug, Clone)]
pub struct RoleDraft {
    original: Role,
    group_ids: Vec<String>,
    initial: IndexMap<String, Vec<String>>,
    name: String,
    assignments: IndexMap<String, Vec<String>>,
    can_write: bool,
}

impl RoleDraft {
    /// Open a draft over `role` for the catalog `groups`.
    pub fn new(role: &Role, groups: &IndexMap<String, PermissionGroup>, can_write: bool) -> Self {
        let group_ids: Vec<String> = groups.keys().cloned().collect();
        let initial = initial_assignments(role, &group_ids);
        Self {
            original: role.clone(),
            name: role.name.clone(),
            assignments: initial.clone(),
            initial,
            group_ids,
            can_write,
        }
    }

    /// Open a draft whose write access comes from `ROLES:write` on the gate.
    pub fn for_gate(
        role: &Role,
        groups: &IndexMap<String, PermissionGroup>,
        gate: &AccessGate,
    ) -> Self {
        let can_write = gate.has_permission(&Requirement::grouped("ROLES", ["write"]));
        Self::new(role, groups, can_write)
    }

    pub fn role_id(&self) -> &str {
        &self.original.id
    }

    pub fn can_write(&self) -> bool {
        self.can_write
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assignments(&self) -> &IndexMap<String, Vec<String>> {
        &self.assignments
    }

    /// Permission ids currently selected for `group_id`.
    pub fn selected(&self, group_id: &str) -> &[String] {
        self.assignments
            .get(group_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Record the typed name. Accepted without write access; `payload` still refuses.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Add `permission_id` to the group, or remove it if already selected.
    pub fn toggle(&mut self, group_id: &str, permission_id: &str) {
        if !self.can_write {
            return;
        }
        let current = self.assignments.entry(group_id.to_owned()).or_default();
        if current.iter().any(|id| id == permission_id) {
            current.retain(|id| id != permission_id);
        } else {
            current.push(permission_id.to_owned());
        }
    }

    /// Replace the group's selection with every permission id.
    pub fn select_all<I, S>(&mut self, group_id: &str, permission_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.can_write {
            return;
        }
        let all = permission_ids.into_iter().map(Into::into).collect();
        self.assignments.insert(group_id.to_owned(), all);
    }

    pub fn clear_group(&mut self, group_id: &str) {
        if self.can_write {
            self.assignments.insert(group_id.to_owned(), Vec::new());
        }
    }

    /// Discard every edit.
    pub fn reset(&mut self) {
        if self.can_write {
            self.name = self.original.name.clone();
            self.assignments = self.initial.clone();
        }
    }

    /// Whether the trimmed name or any catalog group's selection differs from the role.
    ///
    /// Selections compare as sets; order and duplicates are not changes.
    pub fn has_changes(&self) -> bool {
        if self.name.trim() != self.original.name {
            return true;
        }
        self.group_ids.iter().any(|group_id| {
            let next: HashSet<&str> = self.selected(group_id).iter().map(String::as_str).collect();
            let before: HashSet<&str> = self
                .initial
                .get(group_id)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect();
            next != before
        })
    }

    /// Update for the role store, or `None` without write access.
    ///
    /// Only catalog groups are sent, each de-duplicated in selection order. A
    /// blank name keeps the role's current name.
    pub fn payload(&self) -> Option<RoleUpdate> {
        if !self.can_write {
            return None;
        }
        let permissions = self
            .group_ids
            .iter()
            .map(|group_id| {
                let mut seen = HashSet::new();
                let ids = self
                    .selected(group_id)
                    .iter()
                    .filter(|id| seen.insert(id.as_str()))
                    .cloned()
                    .collect();
                (group_id.clone(), ids)
            })
            .collect();
        let trimmed = self.name.trim();
        let name = if trimmed.is_empty() {
            self.original.name.clone()
        } else {
            trimmed.to_owned()
        };
        Some(RoleUpdate {
            id: self.original.id.clone(),
            name,
            permissions,
        })
    }
}

fn initial_assignments(role: &Role, group_ids: &[String]) -> IndexMap<String, Vec<String>> {
    let mut assignments: IndexMap<String, Vec<String>> = group_ids
        .iter()
        .map(|group_id| {
            let assigned = role.permissions.get(group_id).cloned().unwrap_or_default();
            (group_id.clone(), assigned)
        })
        .collect();
    for (group_id, ids) in &role.permissions {
        assignments
            .entry(group_id.clone())
            .or_insert_with(|| ids.clone());
    }
    assignments
}
