//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Role-based access control for the Warden dashboard.
//!
//! Raw role, permission-group, and permission records are normalized into a
//! [`CatalogSnapshot`], reduced to a per-role [`PermissionMatrix`], and queried
//! through an [`AccessGate`] with declarative [`Requirement`]s.

pub mod cache;
pub mod catalog;
pub mod draft;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod matrix;
pub mod metrics;
pub mod navigation;
pub mod requirement;

pub use cache::{CacheStats, MatrixCache};
pub use catalog::{
    normalize_groups, normalize_groups_value, normalize_permissions, normalize_permissions_value,
    normalize_roles, normalize_roles_value, normalize_users, normalize_users_value,
    CatalogDocument, CatalogSnapshot, Permission, PermissionGroup, RawPermission,
    RawPermissionGroup, RawRole, RawUser, Role, User,
};
pub use draft::{RoleDraft, RoleUpdate};
pub use error::CatalogError;
pub use evaluator::{decide, evaluate, AccessDecision};
pub use gate::AccessGate;
pub use matrix::{GroupGrants, PermissionMatrix, RoleMatrix};
pub use metrics::AccessMetrics;
pub use navigation::{
    dashboard_routes, visible_menu_items, MenuItem, RouteEntry, DASHBOARD_BASE_PATH,
};
pub use requirement::{
    normalize_requirement, normalize_requirements, normalize_value, NormalizedRequirement,
    PermissionList, Requirement, RequirementClause,
};
