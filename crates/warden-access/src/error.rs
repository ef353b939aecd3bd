//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Catalog normalization, permission matrices, and access evaluation."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or administering a catalog.
///
/// Access evaluation itself never fails; malformed records degrade to empty
/// sets or a deny decision instead.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog document could not be read from disk.
    #[error("unable to read catalog {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The catalog document is not valid for its format.
    #[error("failed to parse catalog {}: {message}", path.display())]
    Parse {
        /// Path that was being parsed.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// The file extension does not map to a known document format.
    #[error("unsupported catalog format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    /// Role not defined in the catalog.
    #[error("role not found: {0}")]
    UnknownRole(String),
    /// System roles are protected from deletion.
    #[error("system role cannot be deleted: {0}")]
    SystemRole(String),
}
