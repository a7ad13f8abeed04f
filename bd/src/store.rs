//! Work store - authoritative in-memory record of ingestions and batches
//!
//! Batches live in an arena keyed by id; ingestions reference them by id, so an
//! ingestion's status is always derived from live batch state. A single mutex
//! guards the arena, the ingestion map and the priority queue together.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{Batch, BatchId, BatchSnapshot, Ingestion, IngestionId, IngestionSnapshot, Priority, Status};
use crate::error::{Error, Result};
use crate::queue::PriorityQueue;

/// Default maximum number of member ids per batch
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Internal state protected by mutex
#[derive(Default)]
struct StoreInner {
    ingestions: HashMap<IngestionId, Ingestion>,
    batches: HashMap<BatchId, Batch>,
    queue: PriorityQueue,
}

/// Shared store handed to both the HTTP layer and the processor
pub struct Store {
    batch_size: usize,
    inner: Mutex<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl Store {
    /// Create an empty store splitting ingestions into batches of `batch_size`
    pub fn new(batch_size: usize) -> Self {
        debug!(batch_size, "Store::new: called");
        Self {
            batch_size: batch_size.max(1),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Record an ingestion, split it into batches and queue every batch
    pub async fn create_ingestion(&self, ids: Vec<u64>, priority: Priority) -> Result<IngestionId> {
        debug!(count = ids.len(), %priority, "Store::create_ingestion: called");
        if ids.is_empty() {
            return Err(Error::InvalidInput("ids must be a non-empty list".to_string()));
        }

        let ingestion_id = IngestionId::generate();
        let created_at = Utc::now();
        let batches: Vec<Batch> = ids
            .chunks(self.batch_size)
            .map(|chunk| Batch::new(ingestion_id.clone(), chunk.to_vec(), priority, created_at))
            .collect();

        let mut inner = self.inner.lock().await;

        let batch_ids = batches.iter().map(|b| b.id.clone()).collect();
        for batch in batches {
            inner.queue.enqueue(&batch);
            inner.batches.insert(batch.id.clone(), batch);
        }

        inner.ingestions.insert(
            ingestion_id.clone(),
            Ingestion {
                id: ingestion_id.clone(),
                ids,
                priority,
                created_at,
                batch_ids,
            },
        );

        debug!(%ingestion_id, queue_depth = inner.queue.len(), "Store::create_ingestion: queued");
        Ok(ingestion_id)
    }

    /// Snapshot an ingestion with live batch statuses, or `None` if unknown
    pub async fn get_ingestion(&self, id: &str) -> Option<IngestionSnapshot> {
        debug!(%id, "Store::get_ingestion: called");
        let inner = self.inner.lock().await;
        let ingestion = inner.ingestions.get(id)?;

        let batches = ingestion
            .batch_ids
            .iter()
            .filter_map(|batch_id| inner.batches.get(batch_id))
            .map(BatchSnapshot::from)
            .collect();

        Some(IngestionSnapshot::new(ingestion, batches))
    }

    /// Move a batch forward to `status`
    ///
    /// Returns false without changing anything if the batch is unknown or the
    /// update would move it backward.
    pub async fn update_batch_status(&self, id: &BatchId, status: Status) -> bool {
        debug!(batch_id = %id, %status, "Store::update_batch_status: called");
        let mut inner = self.inner.lock().await;

        match inner.batches.get_mut(id) {
            Some(batch) if batch.status.can_advance_to(status) => {
                batch.status = status;
                true
            }
            Some(batch) => {
                debug!(batch_id = %id, current = %batch.status, requested = %status, "Store::update_batch_status: refusing regression");
                false
            }
            None => {
                debug!(batch_id = %id, "Store::update_batch_status: unknown batch");
                false
            }
        }
    }

    /// Live status of a single batch
    pub async fn batch_status(&self, id: &str) -> Option<Status> {
        let inner = self.inner.lock().await;
        inner.batches.get(id).map(|b| b.status)
    }

    /// Remove the next batch from the queue
    ///
    /// This is the only way batches leave the queue.
    pub async fn dequeue_next_batch(&self) -> Option<Batch> {
        let mut inner = self.inner.lock().await;
        let next = inner.queue.dequeue()?;
        let batch = inner.batches.get(&next.batch_id).cloned();
        if batch.is_none() {
            debug!(batch_id = %next.batch_id, "Store::dequeue_next_batch: queued batch missing from arena");
        }
        batch
    }

    /// Number of batches not yet dequeued
    pub async fn queue_depth(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    /// Number of ingestions recorded
    pub async fn ingestion_count(&self) -> usize {
        self.inner.lock().await.ingestions.len()
    }
}
