use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use super::{finish, finish_export, job_context, ExportArgs, ImportArgs};
use crate::{constants::DEVELOPERS_EXPORT_FILE, entities::developers, GlobalArgs};

#[derive(Subcommand, Debug)]
pub enum DevelopersCommands {
    /// Export every developer of the org to a file
    Export(ExportArgs),
    /// Import developers from a file
    Import(ImportArgs),
}

pub async fn run(cmd: DevelopersCommands, global: &GlobalArgs) -> Result<()> {
    let ctx = job_context(global)?;
    match cmd {
        DevelopersCommands::Export(args) => {
            let result = developers::export(&ctx, args.conn).await?;
            let path = args
                .file
                .unwrap_or_else(|| PathBuf::from(DEVELOPERS_EXPORT_FILE));
            finish_export(
                result,
                &path,
                developers::write_export_file,
                args.strict,
                "developers",
            )
        }
        DevelopersCommands::Import(args) => {
            let report = developers::import(&ctx, args.conn, &args.file).await?;
            finish(&report, args.strict, "developers")
        }
    }
}
