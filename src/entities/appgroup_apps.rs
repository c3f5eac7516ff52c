//! Apps owned by app groups: paginated export per group, and batched import
//! that re-creates each app with its original keys.
//!
//! A single-group export file is the group's app array. An all-groups export
//! holds one such array per group (`[[...],[...]]`), and each app carries its
//! `appGroup` so the import knows where to create it.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashSet, fs, path::Path, sync::Arc};

use super::appgroups::{self, APPGROUPS};
use super::apps::{CreatedApp, Credential, KeyRequest};
use super::{read_json_file, ExportResult};
use crate::bulk::{effective_connections, run_batches, BulkReport, ResultList, Worker};
use crate::client::{ApiRequest, JobContext};
use crate::constants::APPGROUPS_PAGE_SIZE;
use crate::error::ItemError;

const APPS: &str = "apps";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppGroupApp {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<Credential>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppGroupAppPage {
    #[serde(default)]
    app_group_apps: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Body of the create call; the app starts without products and its key is discarded
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewApp<'a> {
    name: &'a str,
    key_expires_in: &'a str,
}

/// Every app of `group` as returned by the API, following `nextPageToken`
async fn list_group_apps(ctx: &JobContext, group: &str) -> Result<Vec<Value>, ItemError> {
    let page_size = APPGROUPS_PAGE_SIZE.to_string();
    let mut apps = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut query = vec![("pageSize", page_size.as_str())];
        if let Some(token) = page_token.as_deref() {
            query.push(("pageToken", token));
        }
        let url = ctx.endpoint.url_with_query(&[APPGROUPS, group, APPS], &query);
        let body = ctx.invoke(ApiRequest::get(url)).await?;
        let page: AppGroupAppPage = serde_json::from_slice(&body)?;
        apps.extend(page.app_group_apps);

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    Ok(apps)
}

/// Export the apps of one app group
pub async fn export_apps(ctx: &JobContext, group: &str) -> anyhow::Result<Vec<Value>> {
    list_group_apps(ctx, group)
        .await
        .with_context(|| format!("listing apps of appgroup {group}"))
}

/// Export the apps of every app group, one payload (an app array) per group
pub async fn export_all_apps(ctx: &JobContext, conn: usize) -> anyhow::Result<ExportResult> {
    let groups = appgroups::list_names(ctx).await?;
    tracing::debug!("found {} appgroups in the org", groups.len());
    tracing::info!(
        "exporting apps of {} appgroups with {} connections",
        groups.len(),
        effective_connections(conn, groups.len())
    );

    let results = Arc::new(ResultList::new());
    let worker = GroupAppsExportWorker {
        ctx: ctx.clone(),
        results: Arc::clone(&results),
    };
    let report = run_batches(worker, &groups, conn, "appgroup apps").await;
    Ok(ExportResult {
        payloads: results.drain(),
        report,
    })
}

/// Pretty-print a single group's apps to `path`
pub fn write_apps_file(path: &Path, apps: &[Value]) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(apps)?;
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

pub fn read_apps_file(path: &Path) -> anyhow::Result<Vec<AppGroupApp>> {
    read_json_file(path)
}

/// Import the apps of the file at `path` into `group`. Apps the group
/// already has are left untouched.
pub async fn import_apps(
    ctx: &JobContext,
    conn: usize,
    path: &Path,
    group: &str,
) -> anyhow::Result<BulkReport> {
    let apps = read_apps_file(path)?;
    tracing::debug!("found {} apps in the file", apps.len());

    let known: HashSet<String> = export_apps(ctx, group)
        .await?
        .iter()
        .filter_map(|app| app.get("name")?.as_str().map(str::to_string))
        .collect();
    tracing::info!(
        "creating {} apps in appgroup {group} with {} connections",
        apps.len(),
        effective_connections(conn, apps.len())
    );

    let worker = GroupAppImportWorker {
        ctx: ctx.clone(),
        group: Some(group.to_string()),
        known: Arc::new(known),
    };
    Ok(run_batches(worker, &apps, conn, APPS).await)
}

/// Import an all-groups export, creating every app in its own `appGroup`
pub async fn import_all_apps(
    ctx: &JobContext,
    conn: usize,
    path: &Path,
) -> anyhow::Result<BulkReport> {
    let groups: Vec<Vec<AppGroupApp>> = read_json_file(path)?;
    let apps: Vec<AppGroupApp> = groups.into_iter().flatten().collect();
    tracing::info!(
        "creating {} apps with {} connections",
        apps.len(),
        effective_connections(conn, apps.len())
    );

    let worker = GroupAppImportWorker {
        ctx: ctx.clone(),
        group: None,
        known: Arc::new(HashSet::new()),
    };
    Ok(run_batches(worker, &apps, conn, APPS).await)
}

struct GroupAppsExportWorker {
    ctx: JobContext,
    results: Arc<ResultList>,
}

#[async_trait]
impl Worker for GroupAppsExportWorker {
    type Item = String;

    fn label(&self, group: &String) -> String {
        format!("apps of appgroup {group}")
    }

    async fn run(&self, group: String) -> Result<(), ItemError> {
        let apps = list_group_apps(&self.ctx, &group).await?;
        self.results.append(Bytes::from(serde_json::to_vec(&apps)?));
        Ok(())
    }
}

struct GroupAppImportWorker {
    ctx: JobContext,
    /// Target group for every app; `None` uses each app's own `appGroup`
    group: Option<String>,
    known: Arc<HashSet<String>>,
}

impl GroupAppImportWorker {
    fn group_of<'a>(&'a self, app: &'a AppGroupApp) -> Option<&'a str> {
        self.group
            .as_deref()
            .or(app.app_group.as_deref())
            .filter(|g| !g.is_empty())
    }

    async fn create_key(
        &self,
        group: &str,
        app: &str,
        credential: &Credential,
    ) -> Result<(), ItemError> {
        let ctx = &self.ctx;
        let key = KeyRequest {
            consumer_key: &credential.consumer_key,
            consumer_secret: &credential.consumer_secret,
            scopes: &credential.scopes,
            ..Default::default()
        };
        let url = ctx.endpoint.url(&[APPGROUPS, group, APPS, app, "keys"]);
        let body = serde_json::to_string(&key)?;
        ctx.invoke(ApiRequest::post(url, body).with_output(ctx.output)).await?;

        // products cannot be set when a key is created
        let products = credential.product_names();
        if products.is_empty() {
            return Ok(());
        }
        let url = ctx.endpoint.url(&[
            APPGROUPS,
            group,
            APPS,
            app,
            "keys",
            &credential.consumer_key,
        ]);
        let update = serde_json::json!({ "apiProducts": products });
        ctx.invoke(ApiRequest::post(url, update.to_string())).await?;
        Ok(())
    }
}

#[async_trait]
impl Worker for GroupAppImportWorker {
    type Item = AppGroupApp;

    fn label(&self, app: &AppGroupApp) -> String {
        match self.group_of(app) {
            Some(group) => format!("app {} in appgroup {group}", app.name),
            None => format!("app {}", app.name),
        }
    }

    async fn run(&self, app: AppGroupApp) -> Result<(), ItemError> {
        let ctx = &self.ctx;
        if app.name.is_empty() {
            return Err(ItemError::MissingField("name"));
        }
        let group = self
            .group_of(&app)
            .ok_or(ItemError::MissingField("appGroup"))?
            .to_string();

        if self.known.contains(&app.name) {
            tracing::warn!(
                "app {} in appgroup {group} already exists, updating apps is not supported",
                app.name
            );
            return Ok(());
        }

        // 1. create the app and drop the key the API issues with it
        let new_app = NewApp {
            name: &app.name,
            key_expires_in: "-1",
        };
        let url = ctx.endpoint.url(&[APPGROUPS, &group, APPS]);
        let payload = serde_json::to_string(&new_app)?;
        let body = ctx
            .invoke(ApiRequest::post(url, payload).with_output(ctx.output))
            .await?;
        let created: CreatedApp = serde_json::from_slice(&body)?;
        let generated = created.generated_key()?;
        let url = ctx
            .endpoint
            .url(&[APPGROUPS, &group, APPS, &created.name, "keys", generated]);
        ctx.invoke(ApiRequest::delete(url)).await?;

        // 2. re-create every original key; one failing key does not stop the rest
        let mut first_error = None;
        for credential in &app.credentials {
            if let Err(e) = self.create_key(&group, &app.name, credential).await {
                tracing::error!(
                    "error creating key {} of app {}: {e}",
                    credential.consumer_key,
                    app.name
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::debug!("completed app {} import to appgroup {group}", app.name);
                Ok(())
            }
        }
    }
}
