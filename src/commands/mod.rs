use anyhow::{bail, Result};
use bytes::Bytes;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use crate::{
    bulk::BulkReport,
    client::{ApigeeClient, JobContext},
    config::{load_preferences, ClientSettings},
    constants::DEFAULT_CONNECTIONS,
    entities::ExportResult,
    GlobalArgs,
};

pub mod appgroups;
pub mod apps;
pub mod completions;
pub mod developers;
pub mod prefs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Export or import developer apps")]
    Apps {
        #[command(subcommand)]
        cmd: apps::AppsCommands,
    },
    #[command(about = "Export or import app developers")]
    Developers {
        #[command(subcommand)]
        cmd: developers::DevelopersCommands,
    },
    #[command(about = "Export or import app groups")]
    Appgroups {
        #[command(subcommand)]
        cmd: appgroups::AppGroupsCommands,
    },
    #[command(about = "Manage stored preferences (default org, region, proxy)")]
    Prefs {
        #[command(subcommand)]
        cmd: prefs::PrefsCommands,
    },
    #[command(about = "Emit shell completion scripts (bash/zsh/fish)")]
    Completions { shell: String },
}

pub async fn run(cmd: Commands, global: &GlobalArgs) -> Result<()> {
    match cmd {
        Commands::Apps { cmd } => apps::run(cmd, global).await,
        Commands::Developers { cmd } => developers::run(cmd, global).await,
        Commands::Appgroups { cmd } => appgroups::run(cmd, global).await,
        Commands::Prefs { cmd } => prefs::run(cmd),
        Commands::Completions { shell } => completions::run(shell),
    }
}

/// Flags of every `export` subcommand
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Number of parallel connections
    #[arg(short, long, default_value_t = DEFAULT_CONNECTIONS, value_parser = parse_conn)]
    pub conn: usize,
    /// Output file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Exit with an error when any entity failed to export
    #[arg(long)]
    pub strict: bool,
}

/// Flags of every `import` subcommand
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// File containing the entities to import
    #[arg(short, long)]
    pub file: PathBuf,
    /// Number of parallel connections
    #[arg(short, long, default_value_t = DEFAULT_CONNECTIONS, value_parser = parse_conn)]
    pub conn: usize,
    /// Exit with an error when any entity failed to import
    #[arg(long)]
    pub strict: bool,
}

fn parse_conn(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("connections must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Build the job context from flags, environment and preferences
pub fn job_context(global: &GlobalArgs) -> Result<JobContext> {
    let prefs = load_preferences()?;
    let settings = ClientSettings::resolve(global, &prefs)?;
    ApigeeClient::new(&settings)?.into_job_context()
}

/// Writes drained export payloads to a file
pub type PayloadWriter = fn(&Path, &[Bytes]) -> Result<()>;

/// Write an export file with `write` and report the outcome
pub fn finish_export(
    result: ExportResult,
    path: &Path,
    write: PayloadWriter,
    strict: bool,
    entity: &str,
) -> Result<()> {
    write(path, &result.payloads)?;
    println!(
        "✅ exported {} {entity} to {}",
        result.payloads.len(),
        path.display()
    );
    finish(&result.report, strict, entity)
}

/// Summarize a bulk job. Item failures only fail the command in strict mode.
pub fn finish(report: &BulkReport, strict: bool, entity: &str) -> Result<()> {
    let failed = report.failed();
    if failed == 0 {
        tracing::info!("{} {entity} processed", report.total());
        return Ok(());
    }

    tracing::warn!(
        "{} of {} {entity} succeeded, {failed} failed",
        report.succeeded(),
        report.total()
    );
    if strict {
        let names: Vec<&str> = report.failures().map(|o| o.label.as_str()).collect();
        bail!("{failed} {entity} failed: {}", names.join(", "));
    }
    Ok(())
}
