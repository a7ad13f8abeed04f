//! Processing status for batches and ingestions

use serde::{Deserialize, Serialize};

/// Status of a batch, or the derived status of an ingestion
///
/// Batches only ever move forward through `YetToStart -> Triggered -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    YetToStart,
    Triggered,
    Completed,
}

impl Status {
    /// Derive an ingestion's status from the statuses of its batches
    ///
    /// Completed iff every batch is completed; triggered iff any batch has
    /// been triggered or completed; otherwise yet to start.
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut all_completed = true;
        let mut any_started = false;

        for status in statuses {
            all_completed &= status == Status::Completed;
            any_started |= status != Status::YetToStart;
        }

        if all_completed {
            Status::Completed
        } else if any_started {
            Status::Triggered
        } else {
            Status::YetToStart
        }
    }

    /// True if moving from `self` to `next` never regresses
    pub fn can_advance_to(self, next: Status) -> bool {
        next >= self
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YetToStart => write!(f, "yet_to_start"),
            Self::Triggered => write!(f, "triggered"),
            Self::Completed => write!(f, "completed"),
        }
    }
}
