//! # Apigee CLI
//!
//! A Rust command-line tool for moving developers, developer apps and app groups
//! between Apigee organizations.
//!
//! ## Quick Start
//!
//! ```bash
//! # Remember the source organization
//! apigee prefs set --default-org source-org
//!
//! # Export from the source org
//! export APIGEE_TOKEN=$(gcloud auth print-access-token)
//! apigee developers export --file developers.json
//! apigee apps export --conn 8 --file apps.json
//!
//! # Import into the destination org
//! apigee developers import --org dest-org --file developers.json
//! apigee apps import --org dest-org --file apps.json --dev-file developers.json
//! ```
//!
//! ## Configuration
//!
//! Preferences live in `~/.config/apigee/preferences.yaml` (or the file named by
//! `APIGEE_PREFERENCES_PATH`). Flags and `APIGEE_ORG` / `APIGEE_TOKEN` override them.

use anyhow::Result;
use apigee_cli::{commands, logging, Cli};
use clap::Parser;

/// Main entry point for the Apigee CLI
///
/// Parses command-line arguments, installs logging and delegates to the
/// appropriate command handler.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.debug, cli.global.no_warnings);
    let cmd = cli.cmd.unwrap_or_else(|| {
        eprintln!("No command provided. Use --help to see available commands.");
        std::process::exit(1);
    });
    commands::run(cmd, &cli.global).await
}
