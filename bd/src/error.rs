//! Caller-visible errors
//!
//! Only these cross the core boundary. Failures inside the processor loop are
//! reported as events and never surface here.

use thiserror::Error;

/// Errors returned to callers of the store
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
