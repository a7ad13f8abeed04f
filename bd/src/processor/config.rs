//! Processor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Processor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Minimum time between the starts of consecutive batches
    #[serde(rename = "rate-limit-ms")]
    pub rate_limit_ms: u64,

    /// How long to sleep when the queue is empty
    #[serde(rename = "idle-poll-ms")]
    pub idle_poll_ms: u64,

    /// Simulated processing time per member id
    #[serde(rename = "member-delay-ms")]
    pub member_delay_ms: u64,

    /// How long `stop` waits for an in-flight batch to abort
    #[serde(rename = "unit-grace-ms")]
    pub unit_grace_ms: u64,

    /// How long `stop` then waits for the drain loop to exit
    #[serde(rename = "loop-grace-ms")]
    pub loop_grace_ms: u64,

    /// Suppress event logging (events are still broadcast)
    #[serde(rename = "quiet-mode")]
    pub quiet_mode: bool,

    /// Start the drain loop when the daemon starts
    pub autostart: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: 5000,
            idle_poll_ms: 1000,
            member_delay_ms: 100,
            unit_grace_ms: 100,
            loop_grace_ms: 200,
            quiet_mode: false,
            autostart: true,
        }
    }
}

impl ProcessorConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn member_delay(&self) -> Duration {
        Duration::from_millis(self.member_delay_ms)
    }

    pub fn unit_grace(&self) -> Duration {
        Duration::from_millis(self.unit_grace_ms)
    }

    pub fn loop_grace(&self) -> Duration {
        Duration::from_millis(self.loop_grace_ms)
    }
}
