//! Processor events
//!
//! Emitted for operational visibility. Logging respects quiet mode; the
//! broadcast to subscribers does not.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::domain::{BatchId, IngestionId};

/// Observable processor activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorEvent {
    /// A batch was marked triggered and processing began
    BatchTriggered {
        batch_id: BatchId,
        ingestion_id: IngestionId,
        ids: Vec<u64>,
    },
    /// Every member of a batch was processed
    BatchCompleted {
        batch_id: BatchId,
        ingestion_id: IngestionId,
        processed: usize,
    },
    /// The loop waited out the rate limit before the next batch
    RateLimited { wait: Duration },
    /// A batch failed; the loop moved on
    BatchFailed { batch_id: BatchId, error: String },
    /// A stop request cut a batch short
    BatchInterrupted { batch_id: BatchId },
}

impl ProcessorEvent {
    /// Write the event to the log
    pub(crate) fn log(&self) {
        match self {
            Self::BatchTriggered { batch_id, ingestion_id, ids } => {
                info!(%batch_id, %ingestion_id, ?ids, "Batch triggered");
            }
            Self::BatchCompleted {
                batch_id,
                ingestion_id,
                processed,
            } => {
                info!(%batch_id, %ingestion_id, processed, "Batch completed");
            }
            Self::RateLimited { wait } => {
                info!(wait_ms = wait.as_millis() as u64, "Rate limit: waiting before next batch");
            }
            Self::BatchFailed { batch_id, error } => {
                error!(%batch_id, %error, "Error processing batch");
            }
            Self::BatchInterrupted { batch_id } => {
                warn!(%batch_id, "Batch interrupted by stop request");
            }
        }
    }
}
