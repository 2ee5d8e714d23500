//! `flowseed` binary: runs the startup seeding sequence or reports what the
//! engine store currently holds.

use anyhow::Context;
use clap::{Parser, Subcommand};
use flowseed_core::db::open_existing_db;
use flowseed_core::{
    core_version, init_logging, logging_status, run_startup, store_summary, FlowseedConfig,
    StoreSummary,
};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "flowseed",
    version = core_version(),
    about = "Seed workflow engine identity and deployments"
)]
struct Cli {
    /// TOML config file (defaults to ./flowseed.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite engine store path.
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Directory holding process definitions and seed attachments.
    #[arg(long, global = true)]
    resources: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Ensure groups, users and the process deployment exist (default).
    Seed,
    /// Print groups, users and deployments in an existing engine store.
    Status,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("flowseed error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_dir = absolute(&config.logging.dir)?;
    init_logging(&config.logging.level, &log_dir).context("failed to initialize logging")?;

    match cli.command.unwrap_or(Command::Seed) {
        Command::Seed => {
            let report = run_startup(&config).context("startup seeding failed")?;
            info!(
                "event=cli_seed module=cli status=ok groups_created={} users_created={} deployments_created={}",
                report.groups.created, report.users.created, report.deployments.created
            );
            println!(
                "groups: {} created, {} present",
                report.groups.created, report.groups.skipped
            );
            println!(
                "users: {} created, {} present",
                report.users.created, report.users.skipped
            );
            println!(
                "deployments: {} created, {} present",
                report.deployments.created, report.deployments.skipped
            );
        }
        Command::Status => {
            let conn = open_existing_db(&config.database.path).with_context(|| {
                format!(
                    "failed to open engine store `{}`",
                    config.database.path.display()
                )
            })?;
            let summary = store_summary(&conn).context("failed to read engine store")?;
            print_summary(&summary);
            if let Some((level, dir)) = logging_status() {
                println!("logging: level={level} dir={}", dir.display());
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<FlowseedConfig> {
    let mut config = FlowseedConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    if let Some(dir) = &cli.resources {
        config.resources.dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.logging.dir = dir.clone();
    }
    config
        .validate()
        .context("invalid command-line override")?;
    Ok(config)
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(cwd.join(path))
}

fn print_summary(summary: &StoreSummary) {
    println!("groups ({}):", summary.groups.len());
    for group in &summary.groups {
        println!("  {} \"{}\" [{}]", group.id, group.name, group.kind.as_str());
    }

    println!("users ({}):", summary.users.len());
    for entry in &summary.users {
        println!(
            "  {} <{}> groups={}",
            entry.user.id,
            entry.user.email,
            entry.groups.join(",")
        );
    }

    println!("deployments ({}):", summary.deployments.len());
    for entry in &summary.deployments {
        println!(
            "  {} v{} id={} resources={}",
            entry.deployment.name,
            entry.deployment.version,
            entry.deployment.id,
            entry.resources.len()
        );
        for name in &entry.resources {
            println!("    {name}");
        }
    }
}
