//! App developers: batched export by email and batched import.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{export_details, read_json_file, write_payload_document, Attribute, ExportResult};
use crate::bulk::{effective_connections, run_batches, BulkReport, Worker};
use crate::client::{ApiRequest, JobContext};
use crate::error::ItemError;

const DEVELOPERS: &str = "developers";
const DEVELOPER_KEY: &str = "developer";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Developer {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, rename = "userName", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// The `{"developer": [...]}` document the developers export produces
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct DeveloperList {
    #[serde(default)]
    pub developer: Vec<Developer>,
}

/// A developers file is either the `{"developer": [...]}` document or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum DeveloperFile {
    Bare(Vec<Developer>),
    Listed(DeveloperList),
}

pub fn read_developers_file(path: &Path) -> anyhow::Result<DeveloperList> {
    Ok(match read_json_file(path)? {
        DeveloperFile::Bare(developer) => DeveloperList { developer },
        DeveloperFile::Listed(list) => list,
    })
}

/// Write exported developer payloads as a `{"developer": [...]}` document,
/// which both developer and app imports read back
pub fn write_export_file(path: &Path, payloads: &[Bytes]) -> anyhow::Result<()> {
    write_payload_document(path, DEVELOPER_KEY, payloads)
}

/// Destination-org developer id for `email`
pub(crate) async fn lookup_developer_id(
    ctx: &JobContext,
    email: &str,
) -> Result<String, ItemError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct DeveloperId {
        developer_id: Option<String>,
    }

    let body = ctx
        .invoke(ApiRequest::get(ctx.endpoint.url(&[DEVELOPERS, email])))
        .await?;
    let found: DeveloperId = serde_json::from_slice(&body)?;
    found
        .developer_id
        .filter(|id| !id.is_empty())
        .ok_or(ItemError::MissingField("developerId"))
}

/// List every developer email in the org
pub async fn list_emails(ctx: &JobContext) -> anyhow::Result<Vec<String>> {
    let url = ctx.endpoint.url_with_query(&[DEVELOPERS], &[("expand", "false")]);
    let body = ctx
        .invoke(ApiRequest::get(url))
        .await
        .context("listing developers")?;
    let list: DeveloperList = serde_json::from_slice(&body).context("parsing developers list")?;
    Ok(list.developer.into_iter().map(|d| d.email).collect())
}

/// Export the detail of every developer in the org
pub async fn export(ctx: &JobContext, conn: usize) -> anyhow::Result<ExportResult> {
    let emails = list_emails(ctx).await?;
    tracing::debug!("found {} developers in the org", emails.len());
    Ok(export_details(ctx, DEVELOPERS, emails, conn).await)
}

/// Create every developer of the file at `path`
pub async fn import(ctx: &JobContext, conn: usize, path: &Path) -> anyhow::Result<BulkReport> {
    let list = read_developers_file(path)?;
    tracing::debug!("found {} developers in the file", list.developer.len());
    tracing::info!(
        "creating {} developers with {} connections",
        list.developer.len(),
        effective_connections(conn, list.developer.len())
    );

    let worker = DeveloperImportWorker { ctx: ctx.clone() };
    Ok(run_batches(worker, &list.developer, conn, DEVELOPERS).await)
}

struct DeveloperImportWorker {
    ctx: JobContext,
}

#[async_trait]
impl Worker for DeveloperImportWorker {
    type Item = Developer;

    fn label(&self, developer: &Developer) -> String {
        format!("developer {}", developer.email)
    }

    async fn run(&self, mut developer: Developer) -> Result<(), ItemError> {
        // ids are minted by the destination org
        developer.developer_id = None;
        let payload = serde_json::to_string(&developer)?;
        let url = self.ctx.endpoint.url(&[DEVELOPERS]);
        self.ctx
            .invoke(ApiRequest::post(url, payload).with_output(self.ctx.output))
            .await?;
        Ok(())
    }
}
