use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use super::{finish, finish_export, job_context, ExportArgs, ImportArgs};
use crate::entities::{apps, write_payload_array};
use crate::{constants::APPS_EXPORT_FILE, GlobalArgs};

#[derive(Subcommand, Debug)]
pub enum AppsCommands {
    /// Export every developer app of the org to a file
    Export(ExportArgs),
    /// Import developer apps, re-creating their credentials
    Import {
        #[command(flatten)]
        args: ImportArgs,
        /// Developers export of the source org, used to map app owners
        #[arg(short, long)]
        dev_file: PathBuf,
    },
}

pub async fn run(cmd: AppsCommands, global: &GlobalArgs) -> Result<()> {
    let ctx = job_context(global)?;
    match cmd {
        AppsCommands::Export(args) => {
            let result = apps::export(&ctx, args.conn).await?;
            let path = args.file.unwrap_or_else(|| PathBuf::from(APPS_EXPORT_FILE));
            finish_export(result, &path, write_payload_array, args.strict, "apps")
        }
        AppsCommands::Import { args, dev_file } => {
            let report = apps::import(&ctx, args.conn, &args.file, &dev_file).await?;
            finish(&report, args.strict, "apps")
        }
    }
}
