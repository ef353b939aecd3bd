//! ---
//! warden_section: "05-networking-external-interfaces"
//! warden_subsection: "binary"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Control CLI for checking access against a permission catalog."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{ArgGroup, Args};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::Value;
use tracing::info;
use warden_access::{
    dashboard_routes, visible_menu_items, AccessGate, AccessMetrics, CatalogDocument,
    CatalogError, CatalogSnapshot, MatrixCache, PermissionMatrix, DASHBOARD_BASE_PATH,
};
use warden_common::WardenConfig;

/// Exit status reported when a check is denied.
const DENIED_EXIT_CODE: u8 = 2;

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Catalog document (json, toml, or yaml); defaults to `catalog.path` from configuration.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("subject").required(true).args(["role", "user"])))]
pub struct CheckArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    /// Role id to evaluate.
    #[arg(long)]
    pub role: Option<String>,
    /// Username whose assigned role is evaluated.
    #[arg(long)]
    pub user: Option<String>,
    /// Requirement as JSON, or a bare permission key.
    #[arg(long)]
    pub requirement: String,
}

#[derive(Debug, Args)]
pub struct MatrixArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    /// Limit output to one role.
    #[arg(long)]
    pub role: Option<String>,
}

#[derive(Debug, Args)]
pub struct MenuArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    /// Role id whose menu is listed.
    #[arg(long)]
    pub role: String,
}

/// Shared state for a single invocation.
pub struct Context {
    config: WardenConfig,
    cache: MatrixCache,
    metrics: Option<AccessMetrics>,
}

impl Context {
    pub fn new(config: WardenConfig) -> Result<Self> {
        let metrics = if config.metrics.enabled {
            Some(AccessMetrics::new(
                Arc::new(Registry::new()),
                &config.metrics.namespace,
            )?)
        } else {
            None
        };
        let cache = match &metrics {
            Some(metrics) => MatrixCache::new().with_metrics(metrics.clone()),
            None => MatrixCache::new(),
        };
        Ok(Self {
            config,
            cache,
            metrics,
        })
    }

    fn load_catalog(&self, args: &CatalogArgs) -> Result<CatalogSnapshot> {
        let path = args
            .catalog
            .clone()
            .or_else(|| self.config.catalog.path.clone())
            .ok_or_else(|| anyhow!("no catalog given; pass --catalog or set catalog.path"))?;
        let document = CatalogDocument::from_path(&path)?;
        let snapshot = document.snapshot();
        if snapshot.is_empty() {
            bail!("catalog {} defines no roles or permissions", path.display());
        }
        info!(
            catalog_path = %path.display(),
            roles = snapshot.roles().len(),
            groups = snapshot.groups().len(),
            permissions = snapshot.permissions().len(),
            fingerprint = snapshot.fingerprint(),
            loaded_at = %snapshot.loaded_at().to_rfc3339(),
            "catalog loaded"
        );
        Ok(snapshot)
    }

    fn matrix_for(&self, snapshot: &CatalogSnapshot) -> Arc<PermissionMatrix> {
        if self.config.access.cache_matrix {
            self.cache.get_or_build(snapshot)
        } else {
            Arc::new(snapshot.matrix())
        }
    }

    fn gate(&self, role_id: Option<String>, matrix: Arc<PermissionMatrix>) -> AccessGate {
        let gate = AccessGate::new(role_id, matrix);
        match &self.metrics {
            Some(metrics) => gate.with_metrics(metrics.clone()),
            None => gate,
        }
    }

    pub fn print_metrics(&self) -> Result<()> {
        let Some(metrics) = &self.metrics else {
            eprintln!("metrics are disabled");
            return Ok(());
        };
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metrics.registry().gather(), &mut buffer)?;
        eprint!("{}", String::from_utf8(buffer)?);
        Ok(())
    }
}

pub fn check(context: &Context, args: CheckArgs) -> Result<ExitCode> {
    let snapshot = context.load_catalog(&args.catalog)?;
    let role_id = match (&args.role, &args.user) {
        (Some(role), _) => Some(role.clone()),
        (None, Some(username)) => snapshot
            .user_by_username(username)
            .with_context(|| format!("user not found: {username}"))?
            .role_id
            .clone(),
        (None, None) => bail!("either --role or --user is required"),
    };

    let requirement = parse_requirement(&args.requirement);
    let gate = context.gate(role_id, context.matrix_for(&snapshot));
    let decision = gate.decide_value(&requirement);
    println!("{decision}");
    if decision.is_granted() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(DENIED_EXIT_CODE))
    }
}

pub fn matrix(context: &Context, args: MatrixArgs) -> Result<ExitCode> {
    let snapshot = context.load_catalog(&args.catalog)?;
    let matrix = context.matrix_for(&snapshot);
    let rendered = match &args.role {
        Some(role_id) => {
            let role = matrix
                .role(role_id)
                .ok_or_else(|| CatalogError::UnknownRole(role_id.clone()))?;
            serde_json::to_string_pretty(role)?
        }
        None => serde_json::to_string_pretty(matrix.as_ref())?,
    };
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}

pub fn menu(context: &Context, args: MenuArgs) -> Result<ExitCode> {
    let snapshot = context.load_catalog(&args.catalog)?;
    snapshot.require_role(&args.role)?;
    let gate = context.gate(Some(args.role), context.matrix_for(&snapshot));
    let items = visible_menu_items(&dashboard_routes(), DASHBOARD_BASE_PATH, &gate);
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(ExitCode::SUCCESS)
}

/// A JSON string, object, or array; any other text is a bare permission key.
///
/// Scalars such as `404` or `true` stay keys so they can never read as "no requirement".
fn parse_requirement(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::String(_) | Value::Object(_) | Value::Array(_))) => value,
        _ => Value::String(raw.trim().to_owned()),
    }
}
