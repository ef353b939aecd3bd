//! ---
//! warden_section: "01-core-functionality"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Shared primitives and utilities for the access-control runtime."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_cache_matrix() -> bool {
    true
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_namespace() -> String {
    "warden".to_owned()
}

/// Primary configuration object for Warden tooling.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WardenConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where a [`WardenConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedWardenConfig {
    pub config: WardenConfig,
    pub source: PathBuf,
}

impl WardenConfig {
    pub const ENV_CONFIG_PATH: &str = "WARDEN_CONFIG";

    /// Load configuration from disk, respecting the `WARDEN_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedWardenConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedWardenConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedWardenConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a configuration file at a concrete path.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<WardenConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for WardenConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: WardenConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Location of the catalog document (roles, permission groups, permissions).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub required: bool,
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.required && self.path.is_none() {
            return Err(anyhow!("catalog.required is set but catalog.path is missing"));
        }
        Ok(())
    }
}

/// Tuning for access evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Reuse the derived permission matrix while the catalog fingerprint is unchanged.
    #[serde(default = "default_cache_matrix")]
    pub cache_matrix: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cache_matrix: default_cache_matrix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    #[serde(default)]
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_namespace")]
    pub namespace: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            namespace: default_metrics_namespace(),
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.namespace.trim().is_empty() {
            return Err(anyhow!("metrics.namespace cannot be empty when metrics are enabled"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_document_uses_defaults() {
        let config = WardenConfig::from_str("").unwrap();
        assert!(config.access.cache_matrix);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.namespace, "warden");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.catalog.path.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = WardenConfig::from_str(
            r#"
            [catalog]
            path = "db.json"
            required = true

            [access]
            cache_matrix = false

            [logging]
            format = "structured-json"
            file_output = true
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.path, Some(PathBuf::from("db.json")));
        assert!(!config.access.cache_matrix);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert!(config.logging.file_output);
    }

    #[test]
    fn required_catalog_without_path_is_rejected() {
        let err = WardenConfig::from_str("[catalog]\nrequired = true\n").unwrap_err();
        assert!(format!("{err:#}").contains("catalog.path is missing"));
    }

    #[test]
    fn blank_metrics_namespace_is_rejected() {
        let err = WardenConfig::from_str("[metrics]\nnamespace = \"  \"\n").unwrap_err();
        assert!(format!("{err:#}").contains("metrics.namespace"));
    }

    #[test]
    fn load_picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("warden.toml");
        fs::write(&present, "[access]\ncache_matrix = false\n").unwrap();

        std::env::remove_var(WardenConfig::ENV_CONFIG_PATH);
        let loaded = WardenConfig::load_with_source(&[&missing, &present]).unwrap();
        assert_eq!(loaded.source, present);
        assert!(!loaded.config.access.cache_matrix);
    }

    #[test]
    fn load_reports_inspected_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere.toml");
        std::env::remove_var(WardenConfig::ENV_CONFIG_PATH);
        let err = WardenConfig::load(&[&missing]).unwrap_err();
        assert!(err.to_string().contains("nowhere.toml"));
    }
}
