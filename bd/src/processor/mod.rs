//! Batch processor
//!
//! A single background drain loop that pulls batches from the store in
//! priority order, spaces batch starts by a global rate limit and processes
//! one batch at a time. Every wait is cancellable so stop requests resolve
//! within bounded time.

mod config;
mod core;
mod events;
mod handler;

pub use config::ProcessorConfig;
pub use core::{BatchOutcome, Processor, ProcessorState};
pub use events::ProcessorEvent;
pub use handler::{ExecutionError, MemberHandler, ProcessedMember, SimulatedHandler};
