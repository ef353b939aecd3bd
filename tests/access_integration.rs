//! ---
//! warden_section: "15-testing-qa-runbook"
//! warden_subsection: "integration-tests"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Integration and validation tests for the Warden access stack."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use warden_access::{
    dashboard_routes, visible_menu_items, AccessDecision, AccessGate, AccessMetrics,
    CatalogDocument, CatalogError, CatalogSnapshot, MatrixCache, Requirement, RoleDraft,
    DASHBOARD_BASE_PATH,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

fn snapshot() -> CatalogSnapshot {
    CatalogDocument::from_path(fixture("catalog.json"))
        .unwrap()
        .snapshot()
}

#[test]
fn end_to_end_access_control_flow() {
    let registry = Arc::new(prometheus::Registry::new());
    let metrics = AccessMetrics::new(registry.clone(), "warden").unwrap();
    let cache = MatrixCache::new().with_metrics(metrics.clone());

    // Catalog load + matrix derivation
    let catalog = snapshot();
    let matrix = cache.get_or_build(&catalog);
    assert_eq!(matrix.len(), 3);

    // Login resolves a user to a role
    let bob = catalog.user_by_username("bob").unwrap();
    let gate = AccessGate::new(bob.role_id.clone(), matrix.clone()).with_metrics(metrics.clone());
    assert!(gate.has_permission(&Requirement::grouped("USERS", ["navigate", "read"])));
    assert_eq!(
        gate.decide(Some(&Requirement::grouped("users", ["write"]))),
        AccessDecision::MissingPermission {
            group: Some("USERS".into()),
            permission: "write".into()
        }
    );

    // Navigation follows the same decisions
    let menu = visible_menu_items(&dashboard_routes(), DASHBOARD_BASE_PATH, &gate);
    let ids: Vec<_> = menu.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["overview", "users"]);

    // Role editing is refused without ROLES:write
    let role = catalog.role("role-support").unwrap();
    let mut draft = RoleDraft::for_gate(role, catalog.groups(), &gate);
    draft.toggle("grp-roles", "perm-read");
    assert!(draft.payload().is_none());

    // An administrator can edit and submit
    let admin = AccessGate::new(Some("role-admin".into()), matrix);
    let mut draft = RoleDraft::for_gate(role, catalog.groups(), &admin);
    draft.toggle("grp-roles", "perm-read");
    draft.set_name("Support Desk");
    let update = draft.payload().unwrap();
    assert_eq!(update.name, "Support Desk");
    assert_eq!(update.permissions["grp-roles"], vec!["perm-read".to_owned()]);

    // Reloading an unchanged catalog is served from cache
    cache.get_or_build(&snapshot());
    assert_eq!(metrics.matrix_builds(), 1);
    assert_eq!(metrics.cache_hits(), 1);
    assert_eq!(metrics.granted(), 3);
    assert_eq!(metrics.denied(), 3);
    assert_eq!(registry.gather().len(), 4);
}

#[test]
fn loading_catalog_denies_until_matrix_is_ready() {
    let pending = AccessGate::not_ready(Some("role-admin".into()));
    assert_eq!(
        pending.decide_value(&json!({"group": "USERS", "permissions": "read"})),
        AccessDecision::NotReady
    );
    let menu = visible_menu_items(&dashboard_routes(), DASHBOARD_BASE_PATH, &pending);
    assert_eq!(menu.len(), 1);

    let ready = AccessGate::new(Some("role-admin".into()), Arc::new(snapshot().matrix()));
    assert!(ready.has_permission_value(&json!({"group": "USERS", "permissions": "read"})));
}

#[test]
fn catalog_edits_invalidate_cached_matrix() {
    let cache = MatrixCache::new();
    let before = cache.get_or_build(&snapshot());
    let gate = AccessGate::new(Some("role-support".into()), before);
    assert!(!gate.has_permission(&Requirement::key("delete")));

    let mut document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture("catalog.json")).unwrap()).unwrap();
    document["roles"][1]["permissions"]["grp-users"]
        .as_array_mut()
        .unwrap()
        .push(json!("perm-delete"));
    let edited: CatalogDocument = serde_json::from_value(document).unwrap();
    let after = cache.get_or_build(&edited.snapshot());
    let gate = AccessGate::new(Some("role-support".into()), after);
    assert!(gate.has_permission(&Requirement::key("delete")));
    assert_eq!(cache.stats().builds, 2);
}

#[test]
fn system_roles_cannot_be_deleted() {
    let catalog = snapshot();
    let err = catalog
        .require_role("role-admin")
        .unwrap()
        .ensure_deletable()
        .unwrap_err();
    assert!(matches!(err, CatalogError::SystemRole(id) if id == "role-admin"));
    assert!(catalog
        .require_role("role-support")
        .unwrap()
        .ensure_deletable()
        .is_ok());
    assert!(matches!(
        catalog.require_role("ghost"),
        Err(CatalogError::UnknownRole(_))
    ));
}
