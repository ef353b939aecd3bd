//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::evaluator::{decide, AccessDecision};
use crate::matrix::PermissionMatrix;
use crate::metrics::AccessMetrics;
use crate::requirement::{
    normalize_requirements, normalize_value, NormalizedRequirement, Requirement,
};

/// Decision function handed to pages and actions.
///
/// Binds the current role and the matrix snapshot explicitly; a gate without a
/// matrix represents a catalog that has not loaded yet and denies every
/// non-empty requirement.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    role_id: Option<String>,
    matrix: Option<Arc<PermissionMatrix>>,
    metrics: Option<AccessMetrics>,
}

impl AccessGate {
    /// Gate for `role_id` over a built matrix.
    pub fn new(role_id: Option<String>, matrix: Arc<PermissionMatrix>) -> Self {
        Self {
            role_id,
            matrix: Some(matrix),
            metrics: None,
        }
    }

    /// Gate whose catalog is still loading.
    pub fn not_ready(role_id: Option<String>) -> Self {
        Self {
            role_id,
            matrix: None,
            metrics: None,
        }
    }

    /// Count every decision in Prometheus.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn role_id(&self) -> Option<&str> {
        self.role_id.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.matrix.is_some()
    }

    pub fn matrix(&self) -> Option<&PermissionMatrix> {
        self.matrix.as_deref()
    }

    /// Decide an optional typed requirement.
    pub fn decide(&self, requirement: Option<&Requirement>) -> AccessDecision {
        self.decide_normalized(&normalize_requirements(requirement))
    }

    /// Decide an untyped requirement declaration.
    pub fn decide_value(&self, requirement: &Value) -> AccessDecision {
        self.decide_normalized(&normalize_value(requirement))
    }

    /// Decide already-normalized clauses.
    pub fn decide_normalized(&self, requirements: &[NormalizedRequirement]) -> AccessDecision {
        let decision = decide(self.role_id(), requirements, self.matrix());
        self.record(&decision);
        decision
    }

    pub fn has_permission(&self, requirement: &Requirement) -> bool {
        self.decide(Some(requirement)).is_granted()
    }

    pub fn has_permission_value(&self, requirement: &Value) -> bool {
        self.decide_value(requirement).is_granted()
    }

    fn record(&self, decision: &AccessDecision) {
        if decision.is_granted() {
            if let Some(metrics) = &self.metrics {
                metrics.inc_granted();
            }
            return;
        }
        if let Some(metrics) = &self.metrics {
            metrics.inc_denied();
        }
        debug!(
            role = self.role_id().unwrap_or(""),
            reason = decision.label(),
            detail = %decision,
            "access denied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogDocument;
    use prometheus::Registry;
    use serde_json::json;

    fn matrix() -> Arc<PermissionMatrix> {
        let document: CatalogDocument = serde_json::from_value(json!({
            "permissionGroups": [{"id": "g1", "key": "ROLES"}],
            "permissions": [{"id": "p1", "key": "read"}, {"id": "p2", "key": "write"}],
            "roles": [{"id": "editor", "permissions": {"g1": ["p1", "p2"]}}]
        }))
        .unwrap();
        Arc::new(document.snapshot().matrix())
    }

    #[test]
    fn gate_answers_typed_and_untyped_requirements() {
        let gate = AccessGate::new(Some("editor".into()), matrix());
        assert!(gate.is_ready());
        assert!(gate.has_permission(&Requirement::grouped("roles", ["read", "write"])));
        assert!(gate.has_permission(&Requirement::key("write")));
        assert!(!gate.has_permission(&Requirement::grouped("USERS", ["read"])));
        assert!(gate.has_permission_value(&json!({"group": "ROLES", "permission": "read"})));
        assert!(!gate.has_permission_value(&json!(["read", "delete"])));
    }

    #[test]
    fn not_ready_gate_denies_everything_but_empty_requirements() {
        let gate = AccessGate::not_ready(Some("editor".into()));
        assert!(!gate.is_ready());
        assert_eq!(
            gate.decide(Some(&Requirement::key("read"))),
            AccessDecision::NotReady
        );
        assert!(gate.has_permission_value(&json!([])));
        assert_eq!(gate.decide(None), AccessDecision::NoRequirement);
    }

    #[test]
    fn gate_without_role_denies() {
        let gate = AccessGate::new(None, matrix());
        assert_eq!(gate.decide_value(&json!("read")), AccessDecision::NoRole);
    }

    #[test]
    fn decisions_are_counted() {
        let metrics = AccessMetrics::new(Arc::new(Registry::new()), "warden").unwrap();
        let gate = AccessGate::new(Some("editor".into()), matrix()).with_metrics(metrics.clone());
        gate.has_permission(&Requirement::key("read"));
        gate.has_permission(&Requirement::key("delete"));
        gate.has_permission(&Requirement::key("missing"));
        assert_eq!(metrics.granted(), 1);
        assert_eq!(metrics.denied(), 2);
    }
}
