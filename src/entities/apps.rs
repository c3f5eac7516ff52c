//! Developer apps: batched export by app id, and batched import that re-creates
//! each app under the destination org's developer together with its original
//! credentials.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, sync::Arc};

use super::developers::{self, DeveloperList};
use super::{export_details, read_json_file, Attribute, ExportResult};
use crate::bulk::{effective_connections, run_batches, BulkReport, Worker};
use crate::client::{ApiRequest, JobContext};
use crate::error::ItemError;

const APPS: &str = "apps";

/// A developer app as exported from the source org
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct App {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Vec<Credential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub api_products: Vec<ApiProductRef>,
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    /// String or number depending on the API generation that exported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiProductRef {
    #[serde(rename = "apiproduct")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Body of the create-key and update-key calls
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KeyRequest<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub api_products: Vec<&'a str>,
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub scopes: &'a [String],
}

impl Credential {
    pub fn product_names(&self) -> Vec<&str> {
        self.api_products.iter().map(|p| p.name.as_str()).collect()
    }
}

#[derive(Deserialize)]
struct AppList {
    #[serde(default)]
    app: Vec<AppRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppRef {
    app_id: String,
}

/// Response of an app creation call
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedApp {
    pub name: String,
    #[serde(default)]
    credentials: Vec<CreatedCredential>,
}

impl CreatedApp {
    /// The key the API issued with the new app
    pub fn generated_key(&self) -> Result<&str, ItemError> {
        self.credentials
            .first()
            .map(|c| c.consumer_key.as_str())
            .filter(|k| !k.is_empty())
            .ok_or(ItemError::MissingField("credentials[0].consumerKey"))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedCredential {
    #[serde(default)]
    consumer_key: String,
}

/// Source-org developer id → developer email, built from the developers
/// export that accompanies an apps export
#[derive(Debug, Clone, Default)]
pub struct DeveloperIdentityMap {
    emails: HashMap<String, String>,
}

impl DeveloperIdentityMap {
    pub fn from_developers(list: &DeveloperList) -> Self {
        let emails = list
            .developer
            .iter()
            .filter_map(|d| {
                let id = d.developer_id.as_deref().filter(|id| !id.is_empty())?;
                Some((id.to_string(), d.email.clone()))
            })
            .collect();
        DeveloperIdentityMap { emails }
    }

    pub fn email_for(&self, old_developer_id: &str) -> Option<&str> {
        self.emails.get(old_developer_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// List every app id in the org
pub async fn list_ids(ctx: &JobContext) -> anyhow::Result<Vec<String>> {
    let body = ctx
        .invoke(ApiRequest::get(ctx.endpoint.url(&[APPS])))
        .await
        .context("listing apps")?;
    let list: AppList = serde_json::from_slice(&body).context("parsing apps list")?;
    Ok(list.app.into_iter().map(|a| a.app_id).collect())
}

/// Export the detail of every app in the org
pub async fn export(ctx: &JobContext, conn: usize) -> anyhow::Result<ExportResult> {
    let ids = list_ids(ctx).await?;
    tracing::debug!("found {} apps in the org", ids.len());
    Ok(export_details(ctx, APPS, ids, conn).await)
}

pub fn read_apps_file(path: &Path) -> anyhow::Result<Vec<App>> {
    read_json_file(path)
}

/// Import apps from `apps_path`, mapping their developers through the
/// developers export at `developers_path`
pub async fn import(
    ctx: &JobContext,
    conn: usize,
    apps_path: &Path,
    developers_path: &Path,
) -> anyhow::Result<BulkReport> {
    let apps = read_apps_file(apps_path)?;
    let developers = developers::read_developers_file(developers_path)?;
    let identities = DeveloperIdentityMap::from_developers(&developers);

    tracing::debug!("found {} apps in the file", apps.len());
    tracing::info!(
        "creating {} apps with {} connections",
        apps.len(),
        effective_connections(conn, apps.len())
    );

    let worker = AppImportWorker {
        ctx: ctx.clone(),
        identities: Arc::new(identities),
    };
    Ok(run_batches(worker, &apps, conn, APPS).await)
}

struct AppImportWorker {
    ctx: JobContext,
    identities: Arc<DeveloperIdentityMap>,
}

#[async_trait]
impl Worker for AppImportWorker {
    type Item = App;

    fn label(&self, app: &App) -> String {
        format!("app {}", app.name)
    }

    async fn run(&self, mut app: App) -> Result<(), ItemError> {
        let ctx = &self.ctx;
        if app.name.is_empty() {
            return Err(ItemError::MissingField("name"));
        }

        // 1. map the source developer onto the destination org
        let old_id = app
            .developer_id
            .take()
            .filter(|id| !id.is_empty())
            .ok_or(ItemError::MissingDeveloperId)?;
        let email = self
            .identities
            .email_for(&old_id)
            .ok_or_else(|| ItemError::UnresolvedDeveloper(old_id.clone()))?
            .to_string();
        let developer_id = developers::lookup_developer_id(ctx, &email).await?;

        // 2. create the app without credentials
        let credentials = app.credentials.take().unwrap_or_default();
        let payload = serde_json::to_string(&app)?;
        let url = ctx.endpoint.url(&["developers", &developer_id, APPS]);
        let body = ctx
            .invoke(ApiRequest::post(url, payload).with_output(ctx.output))
            .await?;

        // 3. the API always issues a key on creation; drop it
        let created: CreatedApp = serde_json::from_slice(&body)?;
        let generated = created.generated_key()?;
        let url = ctx
            .endpoint
            .url(&["developers", &email, APPS, &created.name, "keys", generated]);
        ctx.invoke(ApiRequest::delete(url)).await?;

        // 4. re-create the original keys, then attach their products
        let keys_url = ctx
            .endpoint
            .url(&["developers", &developer_id, APPS, &app.name, "keys"]);
        for credential in &credentials {
            let key = KeyRequest {
                consumer_key: &credential.consumer_key,
                consumer_secret: &credential.consumer_secret,
                ..Default::default()
            };
            ctx.invoke(
                ApiRequest::post(keys_url.clone(), serde_json::to_string(&key)?)
                    .with_output(ctx.output),
            )
            .await?;

            let products = credential.product_names();
            if products.is_empty() {
                tracing::warn!("NOTE: apiProducts are not associated with the app {}", app.name);
                continue;
            }
            let update = KeyRequest {
                api_products: products,
                consumer_key: &credential.consumer_key,
                consumer_secret: &credential.consumer_secret,
                scopes: &credential.scopes,
            };
            let url = ctx.endpoint.url(&[
                "developers",
                &developer_id,
                APPS,
                &app.name,
                "keys",
                &credential.consumer_key,
            ]);
            ctx.invoke(
                ApiRequest::post(url, serde_json::to_string(&update)?).with_output(ctx.output),
            )
            .await?;
        }
        Ok(())
    }
}
