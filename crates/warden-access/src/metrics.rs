//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use prometheus::{IntCounter, Opts, Registry};

/// Access-control metrics exported via Prometheus.
#[derive(Clone)]
pub struct AccessMetrics {
    registry: Arc<Registry>,
    decisions_granted_total: IntCounter,
    decisions_denied_total: IntCounter,
    matrix_builds_total: IntCounter,
    matrix_cache_hits_total: IntCounter,
}

impl fmt::Debug for AccessMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessMetrics")
            .field("decisions_granted_total", &self.decisions_granted_total.get())
            .field("decisions_denied_total", &self.decisions_denied_total.get())
            .field("matrix_builds_total", &self.matrix_builds_total.get())
            .field("matrix_cache_hits_total", &self.matrix_cache_hits_total.get())
            .finish_non_exhaustive()
    }
}

impl AccessMetrics {
    /// Register metrics under `namespace` with the provided registry.
    pub fn new(registry: Arc<Registry>, namespace: &str) -> anyhow::Result<Self> {
        let counter = |name: &str, help: &str| {
            IntCounter::with_opts(Opts::new(name, help).namespace(namespace))
        };
        let decisions_granted_total =
            counter("access_decisions_granted_total", "Access checks that were granted")?;
        let decisions_denied_total =
            counter("access_decisions_denied_total", "Access checks that were denied")?;
        let matrix_builds_total =
            counter("permission_matrix_builds_total", "Permission matrix rebuilds")?;
        let matrix_cache_hits_total = counter(
            "permission_matrix_cache_hits_total",
            "Permission matrix lookups served from cache",
        )?;

        registry.register(Box::new(decisions_granted_total.clone()))?;
        registry.register(Box::new(decisions_denied_total.clone()))?;
        registry.register(Box::new(matrix_builds_total.clone()))?;
        registry.register(Box::new(matrix_cache_hits_total.clone()))?;

        Ok(Self {
            registry,
            decisions_granted_total,
            decisions_denied_total,
            matrix_builds_total,
            matrix_cache_hits_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn inc_granted(&self) {
        self.decisions_granted_total.inc();
    }

    pub fn inc_denied(&self) {
        self.decisions_denied_total.inc();
    }

    pub fn inc_matrix_build(&self) {
        self.matrix_builds_total.inc();
    }

    pub fn inc_cache_hit(&self) {
        self.matrix_cache_hits_total.inc();
    }

    pub fn granted(&self) -> u64 {
        self.decisions_granted_total.get()
    }

    pub fn denied(&self) -> u64 {
        self.decisions_denied_total.get()
    }

    pub fn matrix_builds(&self) -> u64 {
        self.matrix_builds_total.get()
    }

    pub fn cache_hits(&self) -> u64 {
        self.matrix_cache_hits_total.get()
    }
}
