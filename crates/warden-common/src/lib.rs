//! ---
//! warden_section: "01-core-functionality"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Shared primitives and utilities for the access-control runtime."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Core shared primitives for the Warden workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the access-control library and the control CLI.

pub mod config;
pub mod logging;

pub use config::{
    AccessConfig, CatalogConfig, LoadedWardenConfig, LoggingConfig, MetricsConfig, WardenConfig,
};
pub use logging::{init_tracing, LogFormat};
