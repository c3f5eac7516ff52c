//! App groups: batched export by name, and batched import that updates groups
//! already present in the destination org and creates the rest.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, sync::Arc};

use super::{export_details, read_json_file, Attribute, ExportResult};
use crate::bulk::{effective_connections, run_batches, BulkReport, Worker};
use crate::client::{ApiRequest, JobContext};
use crate::constants::APPGROUPS_PAGE_SIZE;
use crate::error::ItemError;

pub(crate) const APPGROUPS: &str = "appgroups";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppGroupPage {
    #[serde(default)]
    app_groups: Vec<AppGroup>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Every app group name in the org, following `nextPageToken` to the end
pub async fn list_names(ctx: &JobContext) -> anyhow::Result<Vec<String>> {
    let page_size = APPGROUPS_PAGE_SIZE.to_string();
    let mut names = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut query = vec![("pageSize", page_size.as_str())];
        if let Some(token) = page_token.as_deref() {
            query.push(("pageToken", token));
        }
        let url = ctx.endpoint.url_with_query(&[APPGROUPS], &query);
        let body = ctx
            .invoke(ApiRequest::get(url))
            .await
            .context("listing appgroups")?;
        let page: AppGroupPage =
            serde_json::from_slice(&body).context("parsing appgroups list")?;
        names.extend(page.app_groups.into_iter().map(|g| g.name));

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    Ok(names)
}

/// Export the detail of every app group in the org
pub async fn export(ctx: &JobContext, conn: usize) -> anyhow::Result<ExportResult> {
    let names = list_names(ctx).await?;
    tracing::debug!("found {} appgroups in the org", names.len());
    Ok(export_details(ctx, APPGROUPS, names, conn).await)
}

pub fn read_appgroups_file(path: &Path) -> anyhow::Result<Vec<AppGroup>> {
    read_json_file(path)
}

/// Create or update every app group of the file at `path`
pub async fn import(ctx: &JobContext, conn: usize, path: &Path) -> anyhow::Result<BulkReport> {
    let groups = read_appgroups_file(path)?;
    tracing::debug!("found {} appgroups in the file", groups.len());

    let known: HashSet<String> = list_names(ctx).await?.into_iter().collect();
    tracing::info!(
        "importing {} appgroups with {} connections",
        groups.len(),
        effective_connections(conn, groups.len())
    );

    let worker = AppGroupImportWorker {
        ctx: ctx.clone(),
        known: Arc::new(known),
    };
    Ok(run_batches(worker, &groups, conn, APPGROUPS).await)
}

struct AppGroupImportWorker {
    ctx: JobContext,
    known: Arc<HashSet<String>>,
}

#[async_trait]
impl Worker for AppGroupImportWorker {
    type Item = AppGroup;

    fn label(&self, group: &AppGroup) -> String {
        format!("appgroup {}", group.name)
    }

    async fn run(&self, mut group: AppGroup) -> Result<(), ItemError> {
        let ctx = &self.ctx;
        group.app_group_id = None;
        let payload = serde_json::to_string(&group)?;

        let request = if self.known.contains(&group.name) {
            ApiRequest::put(ctx.endpoint.url(&[APPGROUPS, &group.name]), payload)
        } else {
            ApiRequest::post(ctx.endpoint.url(&[APPGROUPS]), payload)
        };
        ctx.invoke(request.with_output(ctx.output)).await?;
        Ok(())
    }
}
