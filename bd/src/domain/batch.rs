//! Batch and ingestion records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BatchId, IngestionId, Priority, Status};

/// A bounded, contiguous chunk of an ingestion's member ids
///
/// Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub ingestion_id: IngestionId,
    pub ids: Vec<u64>,
    pub status: Status,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Create a new batch in the `YetToStart` state
    pub fn new(ingestion_id: IngestionId, ids: Vec<u64>, priority: Priority, created_at: DateTime<Utc>) -> Self {
        Self {
            id: BatchId::generate(),
            ingestion_id,
            ids,
            status: Status::YetToStart,
            priority,
            created_at,
        }
    }
}

/// An ingestion as held by the store
///
/// Holds references to its batches in chunk order, never copies. Its status is
/// not stored; see [`Status::aggregate`].
#[derive(Debug, Clone)]
pub struct Ingestion {
    pub id: IngestionId,
    pub ids: Vec<u64>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub batch_ids: Vec<BatchId>,
}

/// Point-in-time view of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch_id: BatchId,
    pub ids: Vec<u64>,
    pub status: Status,
}

impl From<&Batch> for BatchSnapshot {
    fn from(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id.clone(),
            ids: batch.ids.clone(),
            status: batch.status,
        }
    }
}

/// Point-in-time view of an ingestion with its derived status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSnapshot {
    pub ingestion_id: IngestionId,
    pub status: Status,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub batches: Vec<BatchSnapshot>,
}

impl IngestionSnapshot {
    /// Build a snapshot from an ingestion and the live batches it references
    pub fn new(ingestion: &Ingestion, batches: Vec<BatchSnapshot>) -> Self {
        Self {
            ingestion_id: ingestion.id.clone(),
            status: Status::aggregate(batches.iter().map(|b| b.status)),
            priority: ingestion.priority,
            created_at: ingestion.created_at,
            batches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingestion(batch_ids: Vec<BatchId>) -> Ingestion {
        Ingestion {
            id: IngestionId::generate(),
            ids: vec![1, 2, 3, 4],
            priority: Priority::High,
            created_at: Utc::now(),
            batch_ids,
        }
    }

    #[test]
    fn test_new_batch_yet_to_start() {
        let batch = Batch::new(IngestionId::generate(), vec![1, 2, 3], Priority::Low, Utc::now());
        assert_eq!(batch.status, Status::YetToStart);
        assert_eq!(batch.ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshot_derives_status() {
        let record = ingestion(vec![BatchId::from("a"), BatchId::from("b")]);
        let snapshot = IngestionSnapshot::new(
            &record,
            vec![
                BatchSnapshot {
                    batch_id: BatchId::from("a"),
                    ids: vec![1, 2, 3],
                    status: Status::Completed,
                },
                BatchSnapshot {
                    batch_id: BatchId::from("b"),
                    ids: vec![4],
                    status: Status::YetToStart,
                },
            ],
        );

        assert_eq!(snapshot.status, Status::Triggered);
        assert_eq!(snapshot.ingestion_id, record.id);
        assert_eq!(snapshot.priority, Priority::High);
    }
}
