//! Per-member processing step

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure while processing a batch
///
/// Caught by the drain loop, reported, and never propagated further.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("member {member_id} failed: {reason}")]
    Member { member_id: u64, reason: String },

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Result of processing one member id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedMember {
    pub id: u64,
    pub data: String,
}

/// Processes a single member id on behalf of the drain loop
///
/// Implementations should return promptly once `cancel` fires; the loop
/// re-checks cancellation after every member regardless.
#[async_trait]
pub trait MemberHandler: Send + Sync {
    async fn process(&self, member_id: u64, cancel: &CancellationToken) -> Result<ProcessedMember, ExecutionError>;
}

/// Stand-in for the external system: waits a fixed delay per member
#[derive(Debug, Clone)]
pub struct SimulatedHandler {
    delay: Duration,
}

impl SimulatedHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl MemberHandler for SimulatedHandler {
    async fn process(&self, member_id: u64, cancel: &CancellationToken) -> Result<ProcessedMember, ExecutionError> {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.delay) => {}
        }

        Ok(ProcessedMember {
            id: member_id,
            data: "processed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_simulated_handler_processes() {
        let handler = SimulatedHandler::new(Duration::from_millis(10));
        let result = handler.process(42, &CancellationToken::new()).await.unwrap();
        assert_eq!(
            result,
            ProcessedMember {
                id: 42,
                data: "processed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_simulated_handler_returns_early_on_cancel() {
        let handler = SimulatedHandler::new(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = Instant::now();
        handler.process(1, &cancel).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
