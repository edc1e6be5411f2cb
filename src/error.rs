//! Error Types
//!
//! Errors shared by the scheduler and the settings synchronization engine.
//!
//! Scheduler-level failures are swallowed at the tick boundary: a failed
//! refresh ([`RefreshError`]) is logged and the loop proceeds to its next
//! wait. Only invalid start arguments surface as [`SchedulerError`]. Settings
//! persistence failures ([`PersistError`]) are surfaced per save attempt and
//! never retried automatically.

use std::time::Duration;

use thiserror::Error;

/// Errors raised when starting a refresh scheduler
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The configured fixed delay is not a positive duration
    #[error("invalid scheduler delay {delay:?}: fixed delay must be positive")]
    InvalidDelay { delay: Duration },
}

/// A scheduled refresh tick failed.
///
/// Transient by definition: the dispatcher owns reporting the underlying
/// cause, the scheduler only logs it and keeps the loop alive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("refresh failed: {message}")]
pub struct RefreshError {
    message: String,
}

impl RefreshError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A settings save could not be persisted on the backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("persist failed: {message}")]
pub struct PersistError {
    message: String,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
