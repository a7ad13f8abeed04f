//! Domain types for batch ingestion
//!
//! An ingestion is a bulk request for a set of member ids. It is split into
//! batches of bounded size which are processed one at a time.

mod batch;
mod id;
mod priority;
mod status;

pub use batch::{Batch, BatchSnapshot, Ingestion, IngestionSnapshot};
pub use id::{BatchId, IngestionId};
pub use priority::Priority;
pub use status::Status;
