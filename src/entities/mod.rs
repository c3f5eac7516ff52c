//! Bulk export and import of the organization's entities.
//!
//! Every entity family follows the same shape: an orchestrator lists (export)
//! or reads (import) the full entity set, then hands it to
//! [`crate::bulk::run_batches`] with an entity-specific worker.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::{fs, io::Write, path::Path, sync::Arc};

use crate::bulk::{effective_connections, run_batches, BulkReport, ResultList, Worker};
use crate::client::{ApiRequest, JobContext};
use crate::error::ItemError;

pub mod appgroup_apps;
pub mod appgroups;
pub mod apps;
pub mod developers;

/// `name`/`value` pair used for custom attributes on every entity
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// Drained payloads of an export job plus its per-item report
#[derive(Debug)]
pub struct ExportResult {
    pub payloads: Vec<Bytes>,
    pub report: BulkReport,
}

/// Fetches one entity's detail and appends it to the shared result list
struct ExportWorker {
    ctx: JobContext,
    collection: &'static str,
    results: Arc<ResultList>,
}

#[async_trait]
impl Worker for ExportWorker {
    type Item = String;

    fn label(&self, item: &String) -> String {
        format!("{}/{item}", self.collection)
    }

    async fn run(&self, id: String) -> Result<(), ItemError> {
        let url = self.ctx.endpoint.url(&[self.collection, &id]);
        let body = self.ctx.invoke(ApiRequest::get(url)).await?;
        self.results.append(body);
        Ok(())
    }
}

/// Batched `GET {collection}/{id}` for every id, aggregating the bodies
pub(crate) async fn export_details(
    ctx: &JobContext,
    collection: &'static str,
    ids: Vec<String>,
    conn: usize,
) -> ExportResult {
    tracing::info!(
        "exporting {} {collection} with {} connections",
        ids.len(),
        effective_connections(conn, ids.len())
    );
    let results = Arc::new(ResultList::new());
    let worker = ExportWorker {
        ctx: ctx.clone(),
        collection,
        results: Arc::clone(&results),
    };
    let report = run_batches(worker, &ids, conn, collection).await;
    ExportResult {
        payloads: results.drain(),
        report,
    }
}

pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Write payloads as one JSON array (`[p1,p2,...]`), replacing the file
pub fn write_payload_array(path: &Path, payloads: &[Bytes]) -> anyhow::Result<()> {
    let mut file = create_file(path)?;
    write_array(&mut file, payloads)?;
    Ok(())
}

/// Write payloads as `{"<key>":[p1,p2,...]}`, the shape list endpoints return
pub fn write_payload_document(path: &Path, key: &str, payloads: &[Bytes]) -> anyhow::Result<()> {
    let mut file = create_file(path)?;
    write!(file, "{{{}:", serde_json::to_string(key)?)?;
    write_array(&mut file, payloads)?;
    file.write_all(b"}")?;
    Ok(())
}

fn create_file(path: &Path) -> anyhow::Result<fs::File> {
    fs::File::create(path).with_context(|| format!("creating {}", path.display()))
}

fn write_array(out: &mut impl Write, payloads: &[Bytes]) -> std::io::Result<()> {
    out.write_all(b"[")?;
    for (i, payload) in payloads.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        out.write_all(payload)?;
    }
    out.write_all(b"]")
}
