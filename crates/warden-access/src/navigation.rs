//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Dashboard menu filtering driven by route requirements.

use serde::{Deserialize, Serialize};

use crate::gate::AccessGate;
use crate::requirement::Requirement;

/// Base path of the dashboard shell.
pub const DASHBOARD_BASE_PATH: &str = "/dashboard";

fn default_menu_item() -> bool {
    true
}

/// Route declaration with its optional access requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub key: String,
    /// Path relative to the dashboard base; `None` for the index route.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, rename = "requiredPermissions")]
    pub required: Option<Requirement>,
    #[serde(default = "default_menu_item", rename = "isMenuItem")]
    pub menu_item: bool,
}

impl RouteEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: None,
            label: None,
            icon: None,
            required: None,
            menu_item: true,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn requiring(mut self, requirement: Requirement) -> Self {
        self.required = Some(requirement);
        self
    }

    /// Link target under `base_path`. Wildcard suffixes (`users/*`) are stripped.
    pub fn href(&self, base_path: &str) -> String {
        let base = base_path.trim_end_matches('/');
        match self
            .path
            .as_deref()
            .map(|path| path.trim_end_matches("/*").trim_matches('/'))
            .filter(|path| !path.is_empty())
        {
            Some(path) => format!("{base}/{path}"),
            None => base.to_owned(),
        }
    }
}

/// Menu entry rendered by the dashboard sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub href: String,
}

/// Menu entries for `routes` that the gate allows.
///
/// Routes without a requirement are always listed. A gate whose catalog has
/// not loaded hides every gated route.
pub fn visible_menu_items(
    routes: &[RouteEntry],
    base_path: &str,
    gate: &AccessGate,
) -> Vec<MenuItem> {
    routes
        .iter()
        .filter(|route| route.menu_item)
        .filter(|route| gate.decide(route.required.as_ref()).is_granted())
        .map(|route| MenuItem {
            id: route.key.clone(),
            label: route.label.clone().unwrap_or_else(|| route.key.clone()),
            icon: route.icon.clone(),
            href: route.href(base_path),
        })
        .collect()
}

/// Default dashboard route table.
pub fn dashboard_routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new("overview")
            .with_label("Overview")
            .with_icon("FiHome"),
        RouteEntry::new("users")
            .with_path("users/*")
            .with_label("Users")
            .with_icon("FiUser")
            .requiring(Requirement::grouped("USERS", ["navigate"])),
        RouteEntry::new("roles")
            .with_path("roles")
            .with_label("Role Permissions")
            .with_icon("FiShield")
            .requiring(Requirement::grouped("ROLES", ["navigate"])),
    ]
}
