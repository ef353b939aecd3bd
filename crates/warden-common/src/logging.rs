//! ---
//! warden_section: "01-core-functionality"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Shared primitives and utilities for the access-control runtime."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "WARDEN_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available log formats for Warden tooling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `WARDEN_LOG` overrides the log filter (e.g. `info`, `debug,warden_access=trace`).
///   When unset the standard `RUST_LOG` variable is honoured, finally defaulting to `info`.
/// * Events go to stderr so command output on stdout stays machine readable. A rolling
///   daily JSON file is added when `file_output` is enabled.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to {} logging",
                LOG_ENV, err, DEFAULT_DIRECTIVE
            );
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    };

    let stderr_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let file_layer = if config.file_output {
        std::fs::create_dir_all(&config.directory)?;
        let prefix = config
            .file_prefix
            .clone()
            .unwrap_or_else(|| service_name.to_owned());
        let file_appender = daily(&config.directory, format!("{}.log", prefix));
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        let _ = FILE_GUARD.set(file_guard);
        Some(
            fmt::layer()
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(file_writer)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        format = ?config.format,
        file_output = config.file_output,
        "tracing initialised"
    );
    Ok(())
}
