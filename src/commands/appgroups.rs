use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::{finish, finish_export, job_context, ExportArgs, ImportArgs};
use crate::client::JobContext;
use crate::constants::{APPGROUPS_EXPORT_FILE, APPGROUP_APPS_EXPORT_FILE};
use crate::entities::{appgroup_apps, appgroups, write_payload_array};
use crate::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum AppGroupsCommands {
    /// Export every app group of the org to a file
    Export(ExportArgs),
    /// Import app groups, updating the ones that already exist
    Import(ImportArgs),
    /// Export or import the apps of app groups
    Apps {
        #[command(subcommand)]
        cmd: AppGroupAppsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum AppGroupAppsCommands {
    /// Export the apps of one app group, or of all of them with --all
    Export {
        #[command(flatten)]
        target: AppGroupTarget,
        #[command(flatten)]
        args: ExportArgs,
    },
    /// Import apps into one app group, or into the groups they name with --all
    Import {
        #[command(flatten)]
        target: AppGroupTarget,
        #[command(flatten)]
        args: ImportArgs,
    },
}

/// Either one named app group or every app group
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct AppGroupTarget {
    /// Name of the app group
    #[arg(short, long)]
    pub name: Option<String>,
    /// Every app group of the org
    #[arg(long)]
    pub all: bool,
}

pub async fn run(cmd: AppGroupsCommands, global: &GlobalArgs) -> Result<()> {
    let ctx = job_context(global)?;
    match cmd {
        AppGroupsCommands::Export(args) => {
            let result = appgroups::export(&ctx, args.conn).await?;
            let path = args
                .file
                .unwrap_or_else(|| PathBuf::from(APPGROUPS_EXPORT_FILE));
            finish_export(result, &path, write_payload_array, args.strict, "appgroups")
        }
        AppGroupsCommands::Import(args) => {
            let report = appgroups::import(&ctx, args.conn, &args.file).await?;
            finish(&report, args.strict, "appgroups")
        }
        AppGroupsCommands::Apps { cmd } => run_apps(cmd, &ctx).await,
    }
}

async fn run_apps(cmd: AppGroupAppsCommands, ctx: &JobContext) -> Result<()> {
    match cmd {
        AppGroupAppsCommands::Export { target, args } => match target.name {
            Some(name) => {
                let apps = appgroup_apps::export_apps(ctx, &name).await?;
                let path = args
                    .file
                    .unwrap_or_else(|| PathBuf::from(format!("{name}_apps.json")));
                appgroup_apps::write_apps_file(&path, &apps)?;
                println!(
                    "✅ exported {} apps of appgroup {name} to {}",
                    apps.len(),
                    path.display()
                );
                Ok(())
            }
            None => {
                let result = appgroup_apps::export_all_apps(ctx, args.conn).await?;
                let path = args
                    .file
                    .unwrap_or_else(|| PathBuf::from(APPGROUP_APPS_EXPORT_FILE));
                finish_export(result, &path, write_payload_array, args.strict, "appgroup apps")
            }
        },
        AppGroupAppsCommands::Import { target, args } => {
            let report = match target.name {
                Some(name) => {
                    appgroup_apps::import_apps(ctx, args.conn, &args.file, &name).await?
                }
                None => appgroup_apps::import_all_apps(ctx, args.conn, &args.file).await?,
            };
            finish(&report, args.strict, "appgroup apps")
        }
    }
}
