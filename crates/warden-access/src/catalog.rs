//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Catalog normalization.
//!
//! Raw role, permission-group, and permission records arrive exactly as the
//! dashboard backend serves them. Normalization turns them into keyed maps
//! with canonical keys and never fails: records that cannot be interpreted are
//! dropped and a collection that is not an array yields an empty map, which
//! callers treat as "not yet loaded".

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::CatalogError;
use crate::matrix::PermissionMatrix;

/// Atomic grantable capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Catalog identifier.
    pub id: String,
    /// Human-readable key matched by requirements.
    pub key: String,
    /// Display name.
    pub name: String,
}

/// Namespace partitioning permissions (e.g. `USERS`, `ROLES`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    /// Catalog identifier referenced by role assignments.
    pub id: String,
    /// Uppercased key matched by requirements.
    pub key: String,
    /// Display name.
    pub name: String,
}

/// Named collection of group to permission-id assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Raw assignment keyed by permission-group id. Absent groups grant nothing.
    #[serde(default)]
    pub permissions: IndexMap<String, Vec<String>>,
    /// Built-in roles cannot be deleted.
    #[serde(default, rename = "systemRole")]
    pub system_role: bool,
}

impl Role {
    /// Whether the role is protected as a built-in.
    pub fn is_system(&self) -> bool {
        self.system_role
    }

    /// Reject deletion of built-in roles.
    pub fn ensure_deletable(&self) -> Result<(), CatalogError> {
        if self.system_role {
            return Err(CatalogError::SystemRole(self.id.clone()));
        }
        Ok(())
    }
}

/// Dashboard account reduced to what access decisions need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Catalog identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Role assigned to the account, if any.
    #[serde(default, rename = "roleId", skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
}

/// Permission record as fetched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPermission {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// Permission-group record as fetched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPermissionGroup {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// Role record as fetched. `permissions` stays untyped until normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRole {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Value,
    #[serde(default, rename = "systemRole")]
    pub system_role: Value,
}

/// User record as fetched. Any password field is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: Option<String>,
    #[serde(default, rename = "roleId", deserialize_with = "lenient_text")]
    pub role_id: Option<String>,
}

/// Accept strings and numbers as text; anything else reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

/// Render a string or number as text. Null, booleans, and structured values yield `None`.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

fn records_from_value<T: DeserializeOwned>(value: &Value, kind: &str) -> Vec<T> {
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            debug!(kind, "catalog collection is not an array; treating as empty");
        }
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(kind, error = %err, "dropping unreadable catalog record");
                None
            }
        })
        .collect()
}

impl RawPermission {
    /// Resolve key as `key`, then `name`, then `id`. Records without an id are dropped.
    pub fn normalize(&self) -> Option<Permission> {
        let id = non_empty(&self.id)?;
        let key = non_empty(&self.key).or(non_empty(&self.name)).unwrap_or(id);
        let name = non_empty(&self.name).or(non_empty(&self.key)).unwrap_or(id);
        Some(Permission {
            id: id.to_owned(),
            key: key.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl RawPermissionGroup {
    /// Resolve key as uppercased `key`, then `name`, then `id`. Records without an id are dropped.
    pub fn normalize(&self) -> Option<PermissionGroup> {
        let id = non_empty(&self.id)?;
        let key = non_empty(&self.key)
            .or(non_empty(&self.name))
            .unwrap_or(id)
            .to_uppercase();
        let name = non_empty(&self.name).or(non_empty(&self.key)).unwrap_or(id);
        Some(PermissionGroup {
            id: id.to_owned(),
            key,
            name: name.to_owned(),
        })
    }
}

impl RawRole {
    /// Stringify assignment entries; non-array group entries become empty lists.
    pub fn normalize(&self) -> Option<Role> {
        let id = non_empty(&self.id)?;
        let mut permissions = IndexMap::new();
        if let Value::Object(groups) = &self.permissions {
            for (group_id, ids) in groups {
                let ids = ids
                    .as_array()
                    .map(|entries| entries.iter().filter_map(scalar_text).collect())
                    .unwrap_or_default();
                permissions.insert(group_id.clone(), ids);
            }
        }
        Some(Role {
            id: id.to_owned(),
            name: non_empty(&self.name).unwrap_or(id).to_owned(),
            permissions,
            system_role: self.system_role.as_bool().unwrap_or(false),
        })
    }
}

impl RawUser {
    /// Records without both an id and a username are dropped.
    pub fn normalize(&self) -> Option<User> {
        let id = non_empty(&self.id)?;
        let username = non_empty(&self.username)?;
        Some(User {
            id: id.to_owned(),
            username: username.to_owned(),
            role_id: non_empty(&self.role_id).map(str::to_owned),
        })
    }
}

/// Convert raw permission records into an id-keyed map.
pub fn normalize_permissions(records: &[RawPermission]) -> IndexMap<String, Permission> {
    records
        .iter()
        .filter_map(RawPermission::normalize)
        .map(|permission| (permission.id.clone(), permission))
        .collect()
}

/// Convert raw permission-group records into an id-keyed map.
pub fn normalize_groups(records: &[RawPermissionGroup]) -> IndexMap<String, PermissionGroup> {
    records
        .iter()
        .filter_map(RawPermissionGroup::normalize)
        .map(|group| (group.id.clone(), group))
        .collect()
}

/// Convert raw role records into an id-keyed map.
pub fn normalize_roles(records: &[RawRole]) -> IndexMap<String, Role> {
    records
        .iter()
        .filter_map(RawRole::normalize)
        .map(|role| (role.id.clone(), role))
        .collect()
}

/// Convert raw user records into an id-keyed map.
pub fn normalize_users(records: &[RawUser]) -> IndexMap<String, User> {
    records
        .iter()
        .filter_map(RawUser::normalize)
        .map(|user| (user.id.clone(), user))
        .collect()
}

/// Normalize an untyped permission collection. Non-array input yields an empty map.
pub fn normalize_permissions_value(value: &Value) -> IndexMap<String, Permission> {
    normalize_permissions(&records_from_value(value, "permissions"))
}

/// Normalize an untyped permission-group collection. Non-array input yields an empty map.
pub fn normalize_groups_value(value: &Value) -> IndexMap<String, PermissionGroup> {
    normalize_groups(&records_from_value(value, "permissionGroups"))
}

/// Normalize an untyped role collection. Non-array input yields an empty map.
pub fn normalize_roles_value(value: &Value) -> IndexMap<String, Role> {
    normalize_roles(&records_from_value(value, "roles"))
}

/// Normalize an untyped user collection. Non-array input yields an empty map.
pub fn normalize_users_value(value: &Value) -> IndexMap<String, User> {
    normalize_users(&records_from_value(value, "users"))
}

/// Document shape served by the development backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub roles: Value,
    #[serde(default)]
    pub permissions: Value,
    #[serde(default, rename = "permissionGroups")]
    pub permission_groups: Value,
    #[serde(default)]
    pub users: Value,
}

impl CatalogDocument {
    /// Read a catalog document; the format follows the file extension (json, toml, yaml/yml).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |message: String| CatalogError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let document = match extension.as_deref() {
            Some("json") => serde_json::from_str(&raw).map_err(|err| parse_error(err.to_string()))?,
            Some("toml") => toml::from_str(&raw).map_err(|err| parse_error(err.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&raw).map_err(|err| parse_error(err.to_string()))?
            }
            _ => return Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        };
        debug!(catalog_path = %path.display(), "catalog document loaded");
        Ok(document)
    }

    /// Normalize every collection into an immutable snapshot.
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot::new(
            normalize_roles_value(&self.roles),
            normalize_groups_value(&self.permission_groups),
            normalize_permissions_value(&self.permissions),
        )
        .with_users(normalize_users_value(&self.users))
    }
}

/// Point-in-time view of the normalized catalog.
///
/// The fingerprint covers roles, groups, and permissions (the inputs of the
/// permission matrix), so it doubles as the cache version key.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    roles: IndexMap<String, Role>,
    groups: IndexMap<String, PermissionGroup>,
    permissions: IndexMap<String, Permission>,
    users: IndexMap<String, User>,
    fingerprint: String,
    loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Assemble a snapshot from already-normalized collections.
    pub fn new(
        roles: IndexMap<String, Role>,
        groups: IndexMap<String, PermissionGroup>,
        permissions: IndexMap<String, Permission>,
    ) -> Self {
        let fingerprint = fingerprint(&roles, &groups, &permissions);
        Self {
            roles,
            groups,
            permissions,
            users: IndexMap::new(),
            fingerprint,
            loaded_at: Utc::now(),
        }
    }

    /// Attach user records. Users do not affect the fingerprint.
    pub fn with_users(mut self, users: IndexMap<String, User>) -> Self {
        self.users = users;
        self
    }

    pub fn roles(&self) -> &IndexMap<String, Role> {
        &self.roles
    }

    pub fn groups(&self) -> &IndexMap<String, PermissionGroup> {
        &self.groups
    }

    pub fn permissions(&self) -> &IndexMap<String, Permission> {
        &self.permissions
    }

    pub fn users(&self) -> &IndexMap<String, User> {
        &self.users
    }

    /// Lookup a role by id.
    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.get(id)
    }

    /// Lookup a role by id, failing when it is not part of the catalog.
    pub fn require_role(&self, id: &str) -> Result<&Role, CatalogError> {
        self.role(id)
            .ok_or_else(|| CatalogError::UnknownRole(id.to_owned()))
    }

    /// Lookup a user by login name.
    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|user| user.username == username)
    }

    /// Hex SHA-256 of the canonical catalog content.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Whether no collection contains any record.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.groups.is_empty() && self.permissions.is_empty()
    }

    /// Derive the role permission matrix for this snapshot.
    pub fn matrix(&self) -> PermissionMatrix {
        PermissionMatrix::build(&self.roles, &self.groups, &self.permissions)
    }
}

#[derive(Serialize)]
struct CanonicalCatalog<'a> {
    roles: BTreeMap<&'a str, &'a Role>,
    groups: BTreeMap<&'a str, &'a PermissionGroup>,
    permissions: BTreeMap<&'a str, &'a Permission>,
}

fn fingerprint(
    roles: &IndexMap<String, Role>,
    groups: &IndexMap<String, PermissionGroup>,
    permissions: &IndexMap<String, Permission>,
) -> String {
    let canonical = CanonicalCatalog {
        roles: roles.iter().map(|(id, role)| (id.as_str(), role)).collect(),
        groups: groups.iter().map(|(id, group)| (id.as_str(), group)).collect(),
        permissions: permissions
            .iter()
            .map(|(id, permission)| (id.as_str(), permission))
            .collect(),
    };
    let mut hasher = Sha256::new();
    // Serializing plain strings, maps, and vectors into a Vec cannot fail.
    if let Ok(bytes) = serde_json::to_vec(&canonical) {
        hasher.update(&bytes);
    }
    hex::encode(hasher.finalize())
}
