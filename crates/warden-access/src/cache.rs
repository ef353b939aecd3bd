//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Permission matrix memoization keyed on the catalog fingerprint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::catalog::CatalogSnapshot;
use crate::matrix::PermissionMatrix;
use crate::metrics::AccessMetrics;

#[derive(Debug)]
struct CachedMatrix {
    fingerprint: String,
    matrix: Arc<PermissionMatrix>,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub builds: u64,
}

/// Holds the matrix of the most recent catalog snapshot.
///
/// A lookup with a different fingerprint rebuilds and replaces the entry, so a
/// stale matrix is never served after any of roles, groups, or permissions change.
#[derive(Debug, Default)]
pub struct MatrixCache {
    slot: RwLock<Option<CachedMatrix>>,
    hits: AtomicU64,
    builds: AtomicU64,
    metrics: Option<AccessMetrics>,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report hits and rebuilds to Prometheus as well.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cached matrix for `fingerprint`, if present.
    pub fn lookup(&self, fingerprint: &str) -> Option<Arc<PermissionMatrix>> {
        self.slot
            .read()
            .as_ref()
            .filter(|cached| cached.fingerprint == fingerprint)
            .map(|cached| cached.matrix.clone())
    }

    /// Return the matrix for `snapshot`, building it on a fingerprint change.
    pub fn get_or_build(&self, snapshot: &CatalogSnapshot) -> Arc<PermissionMatrix> {
        let fingerprint = snapshot.fingerprint();
        if let Some(matrix) = self.lookup(fingerprint) {
            self.record_hit(fingerprint);
            return matrix;
        }

        let built = Arc::new(snapshot.matrix());
        let mut slot = self.slot.write();
        // Another caller may have stored the same snapshot while we were building.
        let stored = slot
            .as_ref()
            .filter(|cached| cached.fingerprint == fingerprint)
            .map(|cached| cached.matrix.clone());
        if let Some(matrix) = stored {
            drop(slot);
            self.record_hit(fingerprint);
            return matrix;
        }
        *slot = Some(CachedMatrix {
            fingerprint: fingerprint.to_owned(),
            matrix: built.clone(),
        });
        drop(slot);

        self.builds.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.inc_matrix_build();
        }
        trace!(fingerprint, roles = built.len(), "permission matrix cache miss");
        built
    }

    /// Drop the cached matrix.
    pub fn invalidate(&self) {
        self.slot.write().take();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
        }
    }

    fn record_hit(&self, fingerprint: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.inc_cache_hit();
        }
        trace!(fingerprint, "permission matrix cache hit");
    }
}
