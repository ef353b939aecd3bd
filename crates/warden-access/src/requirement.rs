//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Requirement declarations and their canonical form.
//!
//! Pages and actions declare what they need as a bare permission key, a
//! `{group, permissions | permission}` clause, or a list of either. All shapes
//! collapse into a list of [`NormalizedRequirement`] before evaluation; the
//! shape polymorphism never reaches the evaluator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::scalar_text;

/// Caller-declared access condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    /// Ungrouped permission key.
    Key(String),
    /// Every element must be satisfied. Nested lists are not a valid element and are ignored.
    // Listed before `Clause` so arrays never deserialize as a positional struct.
    All(Vec<Requirement>),
    /// Grouped or ungrouped clause.
    Clause(RequirementClause),
}

/// Object form of a requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementClause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionList>,
    /// Legacy single-permission alias, consulted only when `permissions` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

/// `permissions` may be a single key or a list of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionList {
    One(String),
    Many(Vec<String>),
}

/// Canonical clause: optional uppercased group plus the permission keys it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedRequirement {
    pub group: Option<String>,
    pub permissions: Vec<String>,
}

impl NormalizedRequirement {
    /// A clause without permissions is satisfied by any known role.
    pub fn is_vacuous(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl Requirement {
    /// Ungrouped requirement on a single permission key.
    pub fn key(key: impl Into<String>) -> Self {
        Requirement::Key(key.into())
    }

    /// Grouped requirement on one or more permission keys.
    pub fn grouped<I, S>(group: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::Clause(RequirementClause {
            group: Some(group.into()),
            permissions: Some(PermissionList::Many(
                permissions.into_iter().map(Into::into).collect(),
            )),
            permission: None,
        })
    }

    /// Conjunction of requirements.
    pub fn all(requirements: impl IntoIterator<Item = Requirement>) -> Self {
        Requirement::All(requirements.into_iter().collect())
    }

    /// Interpret an untyped declaration. Anything that is not a string, object, or
    /// array reads as no requirement.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Requirement::Key(text.clone())),
            Value::Object(_) => Some(Requirement::Clause(RequirementClause::from_value(value))),
            Value::Array(items) => Some(Requirement::All(
                items
                    .iter()
                    .filter(|item| !item.is_array())
                    .filter_map(Requirement::from_value)
                    .collect(),
            )),
            Value::Null | Value::Bool(_) | Value::Number(_) => None,
        }
    }

    /// Canonical clause list. Elements that normalize to nothing are dropped.
    pub fn normalize(&self) -> Vec<NormalizedRequirement> {
        match self {
            Requirement::All(items) => items.iter().filter_map(normalize_requirement).collect(),
            single => normalize_requirement(single).into_iter().collect(),
        }
    }
}

impl From<&str> for Requirement {
    fn from(key: &str) -> Self {
        Requirement::Key(key.to_owned())
    }
}

impl From<RequirementClause> for Requirement {
    fn from(clause: RequirementClause) -> Self {
        Requirement::Clause(clause)
    }
}

impl RequirementClause {
    /// Read the clause fields leniently: scalar groups and permission entries are
    /// stringified, everything else is ignored.
    fn from_value(value: &Value) -> Self {
        let group = value.get("group").and_then(scalar_text);
        let permissions = match value.get("permissions") {
            Some(Value::Array(items)) => Some(PermissionList::Many(
                items.iter().filter_map(scalar_text).collect(),
            )),
            Some(Value::String(text)) => Some(PermissionList::One(text.clone())),
            _ => None,
        };
        let permission = value.get("permission").and_then(scalar_text);
        Self {
            group,
            permissions,
            permission,
        }
    }
}

/// Normalize a single string or clause. Lists, blank keys, and empty input yield `None`.
pub fn normalize_requirement(requirement: &Requirement) -> Option<NormalizedRequirement> {
    match requirement {
        Requirement::Key(key) => {
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some(NormalizedRequirement {
                group: None,
                permissions: vec![key.to_owned()],
            })
        }
        Requirement::Clause(clause) => {
            let group = clause
                .group
                .as_deref()
                .filter(|group| !group.is_empty())
                .map(str::to_uppercase);
            let raw: Vec<&str> = match (&clause.permissions, &clause.permission) {
                (Some(PermissionList::Many(items)), _) => {
                    items.iter().map(String::as_str).collect()
                }
                (Some(PermissionList::One(item)), _) => vec![item.as_str()],
                (None, Some(item)) => vec![item.as_str()],
                (None, None) => Vec::new(),
            };
            let permissions = raw
                .into_iter()
                .map(str::trim)
                .filter(|permission| !permission.is_empty())
                .map(str::to_owned)
                .collect();
            Some(NormalizedRequirement { group, permissions })
        }
        Requirement::All(_) => None,
    }
}

/// Normalize an optional declaration; absence means no requirement.
pub fn normalize_requirements(requirement: Option<&Requirement>) -> Vec<NormalizedRequirement> {
    requirement.map(Requirement::normalize).unwrap_or_default()
}

/// Normalize an untyped declaration.
pub fn normalize_value(value: &Value) -> Vec<NormalizedRequirement> {
    normalize_requirements(Requirement::from_value(value).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clause(group: Option<&str>, permissions: &[&str]) -> NormalizedRequirement {
        NormalizedRequirement {
            group: group.map(str::to_owned),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn bare_string_is_an_ungrouped_key() {
        assert_eq!(normalize_value(&json!("  read ")), vec![clause(None, &["read"])]);
        assert!(normalize_value(&json!("   ")).is_empty());
        assert!(normalize_value(&json!("")).is_empty());
    }

    #[test]
    fn clause_group_is_uppercased() {
        assert_eq!(
            normalize_value(&json!({"group": "users", "permissions": "read"})),
            vec![clause(Some("USERS"), &["read"])]
        );
    }

    #[test]
    fn permissions_take_priority_over_legacy_alias() {
        assert_eq!(
            normalize_value(&json!({"permissions": ["read", " ", "write"], "permission": "x"})),
            vec![clause(None, &["read", "write"])]
        );
        assert_eq!(
            normalize_value(&json!({"group": "ROLES", "permission": "delete"})),
            vec![clause(Some("ROLES"), &["delete"])]
        );
        assert_eq!(
            normalize_value(&json!({"permissions": 5, "permission": "delete"})),
            vec![clause(None, &["delete"])]
        );
    }

    #[test]
    fn clause_without_permissions_is_vacuous() {
        let normalized = normalize_value(&json!({"group": "USERS"}));
        assert_eq!(normalized.len(), 1);
        assert!(normalized[0].is_vacuous());
    }

    #[test]
    fn entries_are_stringified_and_blank_entries_dropped() {
        assert_eq!(
            normalize_value(&json!({"group": 7, "permissions": [1, null, "", " read "]})),
            vec![clause(Some("7"), &["1", "read"])]
        );
    }

    #[test]
    fn lists_normalize_element_wise() {
        let normalized = normalize_value(&json!([
            "read",
            null,
            "",
            {"group": "users", "permissions": ["write"]},
            ["nested"],
            42
        ]));
        assert_eq!(
            normalized,
            vec![clause(None, &["read"]), clause(Some("USERS"), &["write"])]
        );
    }

    #[test]
    fn non_structured_input_is_no_requirement() {
        assert!(normalize_value(&Value::Null).is_empty());
        assert!(normalize_value(&json!(true)).is_empty());
        assert!(normalize_value(&json!(3)).is_empty());
        assert!(normalize_requirements(None).is_empty());
    }

    #[test]
    fn typed_requirements_deserialize_from_every_shape() {
        let key: Requirement = serde_json::from_value(json!("read")).unwrap();
        assert_eq!(key, Requirement::key("read"));

        let grouped: Requirement =
            serde_json::from_value(json!({"group": "USERS", "permissions": ["read"]})).unwrap();
        assert_eq!(grouped, Requirement::grouped("USERS", ["read"]));

        let list: Requirement =
            serde_json::from_value(json!(["read", {"group": "ROLES", "permission": "write"}]))
                .unwrap();
        assert_eq!(
            list.normalize(),
            vec![clause(None, &["read"]), clause(Some("ROLES"), &["write"])]
        );
    }

    #[test]
    fn nested_typed_lists_are_ignored() {
        let requirement = Requirement::all([
            Requirement::all([Requirement::key("read")]),
            Requirement::key("write"),
        ]);
        assert_eq!(requirement.normalize(), vec![clause(None, &["write"])]);
    }
}
