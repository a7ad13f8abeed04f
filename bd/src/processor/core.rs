//! Processor implementation

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{Batch, BatchId, Status};
use crate::store::Store;

use super::config::ProcessorConfig;
use super::events::ProcessorEvent;
use super::handler::{ExecutionError, MemberHandler, SimulatedHandler};

/// Lifecycle state of the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Running,
    Stopping,
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// How a batch execution ended, short of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every member processed; batch marked completed
    Completed,
    /// Stop requested; batch left at its last recorded status
    Interrupted,
}

/// Lifecycle bookkeeping, only touched synchronously
struct Control {
    state: ProcessorState,
    cancel: CancellationToken,
    drain: Option<JoinHandle<()>>,
    generation: u64,
}

/// State shared between the handle and the drain task
struct Shared {
    config: ProcessorConfig,
    store: Arc<Store>,
    handler: Arc<dyn MemberHandler>,
    events: broadcast::Sender<ProcessorEvent>,
    control: Mutex<Control>,
    /// Start time of the most recent batch, across all cycles
    last_started: Mutex<Option<Instant>>,
    /// Batch currently executing, if any
    current: watch::Sender<Option<BatchId>>,
    /// Highest generation whose drain loop has gone away
    exited: watch::Sender<u64>,
}

/// Single-worker batch processor
///
/// Cheap to share behind an `Arc`. `start` must be called from within a tokio
/// runtime.
pub struct Processor {
    shared: Arc<Shared>,
}

impl Processor {
    /// Create a processor using the simulated per-member handler
    pub fn new(config: ProcessorConfig, store: Arc<Store>) -> Self {
        let handler = Arc::new(SimulatedHandler::new(config.member_delay()));
        Self::with_handler(config, store, handler)
    }

    /// Create a processor with a custom per-member handler
    pub fn with_handler(config: ProcessorConfig, store: Arc<Store>, handler: Arc<dyn MemberHandler>) -> Self {
        debug!(?config, "Processor::with_handler: called");
        let (events, _) = broadcast::channel(256);
        let (current, _) = watch::channel(None);
        let (exited, _) = watch::channel(0);

        Self {
            shared: Arc::new(Shared {
                config,
                store,
                handler,
                events,
                control: Mutex::new(Control {
                    state: ProcessorState::Idle,
                    cancel: CancellationToken::new(),
                    drain: None,
                    generation: 0,
                }),
                last_started: Mutex::new(None),
                current,
                exited,
            }),
        }
    }

    /// Start the drain loop; no-op if already running
    pub fn start(&self) {
        debug!("Processor::start: called");
        let mut control = self.shared.lock_control();

        if control.state == ProcessorState::Running {
            debug!("Processor::start: already running");
            return;
        }

        // A loop from an earlier cycle may still be winding down
        let stale = control.drain.take();
        if let Some(stale) = &stale {
            debug!("Processor::start: aborting previous drain task");
            stale.abort();
        }

        control.cancel.cancel();
        control.generation += 1;
        control.cancel = CancellationToken::new();
        control.state = ProcessorState::Running;

        let generation = control.generation;
        let task = drain(self.shared.clone(), stale, control.cancel.clone(), generation);
        control.drain = Some(tokio::spawn(task));

        info!(generation, "Processor started");
    }

    /// Request a graceful stop and wait a bounded time for it
    ///
    /// Gives an in-flight batch `unit-grace-ms` to abort, then the drain loop
    /// `loop-grace-ms` to exit. A loop still running after that is aborted.
    pub async fn stop(&self) {
        debug!("Processor::stop: called");
        let generation = {
            let mut control = self.shared.lock_control();
            if control.state == ProcessorState::Idle && control.drain.is_none() {
                debug!("Processor::stop: already idle");
                return;
            }
            control.state = ProcessorState::Stopping;
            control.cancel.cancel();
            control.generation
        };

        let mut current = self.shared.current.subscribe();
        let in_flight = async move { current.wait_for(Option::is_none).await.map(|_| ()) };
        if tokio::time::timeout(self.shared.config.unit_grace(), in_flight).await.is_err() {
            warn!("In-flight batch did not abort within grace period");
        }

        let mut exited = self.shared.exited.subscribe();
        let loop_exit = async move { exited.wait_for(|g| *g >= generation).await.map(|_| ()) };
        if tokio::time::timeout(self.shared.config.loop_grace(), loop_exit).await.is_err() {
            let control = self.shared.lock_control();
            // A newer start() has already taken over the old loop
            if control.generation == generation {
                warn!("Drain loop did not exit within grace period, aborting");
                if let Some(drain) = &control.drain {
                    drain.abort();
                }
                self.shared.current.send_replace(None);
            }
        }

        let mut control = self.shared.lock_control();
        if control.generation == generation && control.state == ProcessorState::Stopping {
            control.state = ProcessorState::Idle;
            info!("Processor stopped");
        } else {
            debug!(generation, "Processor::stop: superseded by a newer start");
        }
    }

    /// Stop immediately without waiting for anything
    pub fn force_stop(&self) {
        debug!("Processor::force_stop: called");
        let mut control = self.shared.lock_control();
        control.cancel.cancel();
        // Handle stays put so the next start() waits for the abort to land
        if let Some(drain) = &control.drain {
            drain.abort();
        }
        control.state = ProcessorState::Idle;
        self.shared.current.send_replace(None);
        info!("Processor force-stopped");
    }

    pub fn state(&self) -> ProcessorState {
        self.shared.lock_control().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == ProcessorState::Running
    }

    /// Id of the batch executing right now
    pub fn current_batch(&self) -> Option<BatchId> {
        self.shared.current.borrow().clone()
    }

    /// Subscribe to processor events
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessorEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.shared.store
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        self.shared.lock_control().cancel.cancel();
    }
}

impl Shared {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ProcessorEvent) {
        if !self.config.quiet_mode {
            event.log();
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Remaining wait before the next batch may start
    fn rate_limit_wait(&self) -> Option<Duration> {
        let last = (*self.last_started.lock().unwrap_or_else(PoisonError::into_inner))?;
        let limit = self.config.rate_limit();
        let elapsed = last.elapsed();
        (elapsed < limit).then(|| limit - elapsed)
    }

    fn mark_started(&self) {
        *self.last_started.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    /// Clear the in-flight marker if it still names `batch_id`
    fn clear_current(&self, batch_id: &BatchId) {
        self.current.send_if_modified(|current| {
            if current.as_ref() == Some(batch_id) {
                *current = None;
                true
            } else {
                false
            }
        });
    }

    /// Drain loop exit; leaves newer cycles alone
    fn finish(&self, generation: u64) {
        let mut control = self.lock_control();
        if control.generation == generation {
            control.drain = None;
            if control.state == ProcessorState::Running {
                control.state = ProcessorState::Idle;
            }
        }
    }

    async fn execute(&self, batch: Batch, cancel: &CancellationToken) -> Result<BatchOutcome, ExecutionError> {
        if cancel.is_cancelled() {
            return Ok(BatchOutcome::Interrupted);
        }

        self.store.update_batch_status(&batch.id, Status::Triggered).await;
        self.emit(ProcessorEvent::BatchTriggered {
            batch_id: batch.id.clone(),
            ingestion_id: batch.ingestion_id.clone(),
            ids: batch.ids.clone(),
        });

        let mut processed = Vec::with_capacity(batch.ids.len());
        for &member_id in &batch.ids {
            if cancel.is_cancelled() {
                return Ok(BatchOutcome::Interrupted);
            }
            processed.push(self.handler.process(member_id, cancel).await?);
        }

        if cancel.is_cancelled() {
            return Ok(BatchOutcome::Interrupted);
        }

        self.store.update_batch_status(&batch.id, Status::Completed).await;
        self.emit(ProcessorEvent::BatchCompleted {
            batch_id: batch.id,
            ingestion_id: batch.ingestion_id,
            processed: processed.len(),
        });

        Ok(BatchOutcome::Completed)
    }
}

/// Sleep for `duration` unless cancelled first
async fn pause(cancel: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Marks a drain generation as gone, however its task ends
struct ExitGuard {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        self.shared.exited.send_if_modified(|exited| {
            if *exited < generation {
                *exited = generation;
                true
            } else {
                false
            }
        });
    }
}

fn drain(
    shared: Arc<Shared>,
    stale: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    generation: u64,
) -> impl Future<Output = ()> + Send + 'static {
    // Built outside the async block so it fires even if the task is aborted
    // before its first poll
    let exit = ExitGuard {
        shared: shared.clone(),
        generation,
    };

    async move {
        let _exit = exit;

        if let Some(stale) = stale {
            // Aborted in start(); never let two loops touch the queue at once
            let _ = stale.await;
            shared.current.send_replace(None);
        }

        run(&shared, &cancel, generation).await;
    }
}

async fn run(shared: &Shared, cancel: &CancellationToken, generation: u64) {
    info!(generation, "Drain loop started");

    while !cancel.is_cancelled() {
        let Some(batch) = shared.store.dequeue_next_batch().await else {
            pause(cancel, shared.config.idle_poll()).await;
            continue;
        };

        if let Some(wait) = shared.rate_limit_wait() {
            shared.emit(ProcessorEvent::RateLimited { wait });
            pause(cancel, wait).await;
        }

        if cancel.is_cancelled() {
            debug!(batch_id = %batch.id, "drain: stop requested before batch started");
            shared.emit(ProcessorEvent::BatchInterrupted { batch_id: batch.id });
            break;
        }

        shared.mark_started();
        let batch_id = batch.id.clone();
        shared.current.send_replace(Some(batch_id.clone()));

        let result = AssertUnwindSafe(shared.execute(batch, cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ExecutionError::Panicked(panic_message(panic))));

        match result {
            Ok(BatchOutcome::Completed) => {}
            Ok(BatchOutcome::Interrupted) => {
                shared.emit(ProcessorEvent::BatchInterrupted {
                    batch_id: batch_id.clone(),
                });
            }
            Err(e) => {
                shared.emit(ProcessorEvent::BatchFailed {
                    batch_id: batch_id.clone(),
                    error: e.to_string(),
                });
            }
        }

        shared.clear_current(&batch_id);
    }

    shared.finish(generation);
    info!(generation, "Drain loop exited");
}
