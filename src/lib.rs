//! # Apigee CLI Library
//!
//! Core library functionality for the Apigee CLI tool: the control plane
//! client, the bounded-concurrency bulk engine and the per-entity import and
//! export jobs built on it.

use clap::{Args, Parser};

pub mod bulk;
pub mod client;
pub mod commands;
pub mod config;
pub mod constants;
pub mod entities;
pub mod error;
pub mod logging;

/// CLI tool for bulk import and export against the Apigee control plane
///
/// Exports developers, developer apps and app groups from an organization to
/// JSON files, and imports them into another organization, running a bounded
/// number of API calls in parallel.
#[derive(Parser)]
#[command(
    name = "apigee",
    version,
    about = "CLI tool for bulk import and export of Apigee entities",
    long_about = "A Rust command-line tool for the Apigee API management control plane.\n\nExports and imports developers, developer apps and app groups in bounded parallel batches,\nre-creating app credentials and developer links in the destination organization."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Option<commands::Commands>,
}

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Apigee organization name
    #[arg(short, long, global = true, env = "APIGEE_ORG")]
    pub org: Option<String>,

    /// Google OAuth access token
    #[arg(short, long, global = true, env = "APIGEE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Control plane region for data residency organizations
    #[arg(short, long, global = true)]
    pub region: Option<String>,

    /// Control plane to target
    #[arg(long, global = true, value_enum)]
    pub api: Option<config::ApiTarget>,

    /// Do not print API responses to stdout
    #[arg(long, global = true)]
    pub no_output: bool,

    /// Enable debug logs
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only log errors
    #[arg(long, global = true)]
    pub no_warnings: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}
