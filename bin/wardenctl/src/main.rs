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

use anyhow::Result;
use clap::{Parser, Subcommand};
use warden_common::WardenConfig;

mod access;

const CONFIG_CANDIDATES: [&str; 2] = ["warden.toml", "configs/warden.toml"];

#[derive(Debug, Parser)]
#[command(author, version, about = "Warden access-control utility", long_about = None)]
struct Cli {
    /// Configuration file; defaults to `WARDEN_CONFIG` or `warden.toml`.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Dump Prometheus counters to stderr after the command.
    #[arg(long, global = true)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decide whether a role or user satisfies a requirement.
    Check(access::CheckArgs),
    /// Print the derived role permission matrix as JSON.
    Matrix(access::MatrixArgs),
    /// Print the dashboard menu visible to a role.
    Menu(access::MenuArgs),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    warden_common::init_tracing("wardenctl", &config.logging)?;

    let context = access::Context::new(config)?;
    let code = match cli.command {
        Commands::Check(args) => access::check(&context, args)?,
        Commands::Matrix(args) => access::matrix(&context, args)?,
        Commands::Menu(args) => access::menu(&context, args)?,
    };
    if cli.print_metrics {
        context.print_metrics()?;
    }
    Ok(code)
}

fn load_config(explicit: Option<&PathBuf>) -> Result<WardenConfig> {
    if let Some(path) = explicit {
        return WardenConfig::from_path(path);
    }
    let env_override = std::env::var(WardenConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    let candidate_present = CONFIG_CANDIDATES
        .iter()
        .any(|candidate| PathBuf::from(candidate).exists());
    if env_override || candidate_present {
        return WardenConfig::load(&CONFIG_CANDIDATES[..]);
    }
    Ok(WardenConfig::default())
}
