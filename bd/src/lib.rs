//! batchd - priority-ordered, rate-limited batch ingestion
//!
//! Ingestions of member ids are split into small batches, queued by priority
//! and drained by a single background worker that spaces batch starts by a
//! global rate limit.
//!
//! # Modules
//!
//! - [`domain`] - ids, priorities, statuses and records
//! - [`queue`] - priority queue of pending batches
//! - [`store`] - in-memory store with derived ingestion status
//! - [`processor`] - the rate-limited, cancellable drain loop
//! - [`api`] - HTTP routes
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod processor;
pub mod queue;
pub mod store;

// Re-export commonly used types
pub use api::{AppState, router};
pub use config::{Config, IngestConfig, ServerConfig};
pub use domain::{Batch, BatchId, BatchSnapshot, IngestionId, IngestionSnapshot, Priority, Status};
pub use error::Error;
pub use processor::{
    BatchOutcome, ExecutionError, MemberHandler, ProcessedMember, Processor, ProcessorConfig, ProcessorEvent,
    ProcessorState, SimulatedHandler,
};
pub use queue::PriorityQueue;
pub use store::Store;
