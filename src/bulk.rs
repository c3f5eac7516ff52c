//! Bounded-concurrency batch execution for bulk import and export.
//!
//! Items are cut into contiguous batches of at most `conn` elements. Each batch
//! is spawned into its own [`JoinSet`], one task per item, and fully joined
//! before the next batch starts, so no more than `conn` workers are ever in
//! flight. A failing item is logged and recorded in the [`BulkReport`]; it never
//! aborts its siblings or later batches.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;

use crate::error::ItemError;

/// Clamp a connection budget to the number of items (and to at least one)
pub fn effective_connections(conn: usize, total: usize) -> usize {
    conn.max(1).min(total.max(1))
}

/// Split `items` into contiguous batches of `min(conn, items.len())` elements;
/// the last batch holds the remainder. An empty input yields no batches.
pub fn partition<T>(items: &[T], conn: usize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }
    items
        .chunks(effective_connections(conn, items.len()))
        .collect()
}

/// Lock-protected payload list filled by export workers
#[derive(Debug, Default)]
pub struct ResultList {
    payloads: Mutex<Vec<Bytes>>,
}

impl ResultList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, payload: Bytes) {
        self.lock().push(payload);
    }

    /// Take every accumulated payload, leaving the list empty.
    /// Only call once all workers that append have been joined.
    pub fn drain(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Bytes>> {
        // a worker that panicked mid-push cannot leave the Vec inconsistent
        self.payloads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The single-entity operation of a bulk job
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Short name of the item for logs and reports
    fn label(&self, item: &Self::Item) -> String;

    async fn run(&self, item: Self::Item) -> Result<(), ItemError>;
}

/// Result of one item
#[derive(Debug)]
pub struct ItemOutcome {
    pub index: usize,
    pub label: String,
    pub result: Result<(), ItemError>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-item results of a bulk job, ordered by item index
#[derive(Debug, Default)]
pub struct BulkReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BulkReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Runs one batch at a time through a shared worker
pub struct BatchRunner<W: Worker> {
    worker: Arc<W>,
}

impl<W: Worker> BatchRunner<W> {
    pub fn new(worker: W) -> Self {
        BatchRunner {
            worker: Arc::new(worker),
        }
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    /// Spawn one task per item and wait for all of them. `offset` is the index
    /// of the batch's first item within the whole job.
    pub async fn run_batch(&self, batch: &[W::Item], offset: usize) -> Vec<ItemOutcome> {
        let mut set = JoinSet::new();
        let mut labels = Vec::with_capacity(batch.len());

        for (i, item) in batch.iter().enumerate() {
            let index = offset + i;
            labels.push(self.worker.label(item));
            let worker = Arc::clone(&self.worker);
            let item = item.clone();
            set.spawn(async move { (index, worker.run(item).await) });
        }

        let mut done: Vec<Option<Result<(), ItemError>>> =
            (0..batch.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => done[index - offset] = Some(result),
                // the slot stays empty and is reported below
                Err(e) => tracing::error!("worker task failed: {e}"),
            }
        }

        done.into_iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (result, label))| {
                let result =
                    result.unwrap_or_else(|| Err(ItemError::Task("worker panicked".to_string())));
                match &result {
                    Ok(()) => tracing::debug!("completed entity: {label}"),
                    Err(e) => tracing::error!("error with entity {label}: {e}"),
                }
                ItemOutcome {
                    index: offset + i,
                    label,
                    result,
                }
            })
            .collect()
    }

    /// Partition `items` and run the batches strictly one after another
    pub async fn run_all(&self, items: &[W::Item], conn: usize, entity: &str) -> BulkReport {
        let batches = partition(items, conn);
        let conn = effective_connections(conn, items.len());
        let full = items.len() / conn;

        let mut report = BulkReport {
            outcomes: Vec::with_capacity(items.len()),
        };
        let mut offset = 0;
        for (i, batch) in batches.into_iter().enumerate() {
            if i < full {
                tracing::debug!("processing batch {} of {entity}", i + 1);
            } else {
                tracing::debug!("processing remaining {} {entity}", batch.len());
            }
            report.outcomes.extend(self.run_batch(batch, offset).await);
            offset += batch.len();
        }
        report
    }
}

/// Run a complete bulk job
pub async fn run_batches<W: Worker>(
    worker: W,
    items: &[W::Item],
    conn: usize,
    entity: &str,
) -> BulkReport {
    BatchRunner::new(worker).run_all(items, conn, entity).await
}
