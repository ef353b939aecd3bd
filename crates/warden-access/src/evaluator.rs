//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Access evaluation.
//!
//! A pure function of (role id, normalized requirements, matrix snapshot).
//! Clauses combine with AND. An ungrouped clause is satisfied by keys granted
//! in any group of the role; a grouped clause only by keys of that group. A
//! missing matrix means the catalog is not loaded yet and always denies.

use std::fmt;

use crate::matrix::{PermissionMatrix, RoleMatrix};
use crate::requirement::NormalizedRequirement;

/// Outcome of an access check together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Nothing was required.
    NoRequirement,
    /// Every clause passed.
    Granted,
    /// The permission matrix has not been built yet.
    NotReady,
    /// No role id was supplied.
    NoRole,
    /// The role id has no entry in the matrix.
    UnknownRole(String),
    /// A grouped clause named a group the role has no grants in.
    MissingGroup(String),
    /// A clause listed a permission key the role lacks.
    MissingPermission {
        group: Option<String>,
        permission: String,
    },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::NoRequirement | AccessDecision::Granted)
    }

    /// Short machine-friendly label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            AccessDecision::NoRequirement => "no_requirement",
            AccessDecision::Granted => "granted",
            AccessDecision::NotReady => "not_ready",
            AccessDecision::NoRole => "no_role",
            AccessDecision::UnknownRole(_) => "unknown_role",
            AccessDecision::MissingGroup(_) => "missing_group",
            AccessDecision::MissingPermission { .. } => "missing_permission",
        }
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessDecision::NoRequirement => write!(f, "allow: no requirement"),
            AccessDecision::Granted => write!(f, "allow: all requirements satisfied"),
            AccessDecision::NotReady => write!(f, "deny: permission catalog not loaded"),
            AccessDecision::NoRole => write!(f, "deny: no role"),
            AccessDecision::UnknownRole(role) => write!(f, "deny: unknown role {role}"),
            AccessDecision::MissingGroup(group) => write!(f, "deny: no grants in group {group}"),
            AccessDecision::MissingPermission {
                group: Some(group),
                permission,
            } => write!(f, "deny: missing {group}:{permission}"),
            AccessDecision::MissingPermission {
                group: None,
                permission,
            } => write!(f, "deny: missing {permission}"),
        }
    }
}

/// Decide access and report which rule applied.
pub fn decide(
    role_id: Option<&str>,
    requirements: &[NormalizedRequirement],
    matrix: Option<&PermissionMatrix>,
) -> AccessDecision {
    if requirements.is_empty() {
        return AccessDecision::NoRequirement;
    }
    let Some(matrix) = matrix else {
        return AccessDecision::NotReady;
    };
    let Some(role_id) = role_id.filter(|id| !id.is_empty()) else {
        return AccessDecision::NoRole;
    };
    let Some(role) = matrix.role(role_id) else {
        return AccessDecision::UnknownRole(role_id.to_owned());
    };

    for requirement in requirements {
        if let Some(denied) = check_clause(role, requirement) {
            return denied;
        }
    }
    AccessDecision::Granted
}

/// Boolean form of [`decide`].
pub fn evaluate(
    role_id: Option<&str>,
    requirements: &[NormalizedRequirement],
    matrix: Option<&PermissionMatrix>,
) -> bool {
    decide(role_id, requirements, matrix).is_granted()
}

fn check_clause(role: &RoleMatrix, requirement: &NormalizedRequirement) -> Option<AccessDecision> {
    if requirement.is_vacuous() {
        return None;
    }
    match requirement.group.as_deref() {
        None => requirement
            .permissions
            .iter()
            .find(|permission| !role.has_key_in_any_group(permission))
            .map(|permission| AccessDecision::MissingPermission {
                group: None,
                permission: permission.clone(),
            }),
        Some(group) => {
            let Some(grants) = role.group(group) else {
                return Some(AccessDecision::MissingGroup(group.to_owned()));
            };
            requirement
                .permissions
                .iter()
                .find(|permission| !grants.has_key(permission))
                .map(|permission| AccessDecision::MissingPermission {
                    group: Some(group.to_owned()),
                    permission: permission.clone(),
                })
        }
    }
}
