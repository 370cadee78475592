use thiserror::Error;
use uuid::Uuid;

/// Raised when an assignment cannot be tracked.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Invalid assignment: {0}")]
    InvalidAssignment(String),
}

/// A single positioning attempt failed. Transient: the sample is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationUnavailable {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Timed out waiting for a position fix")]
    Timeout,
    #[error("Positioning is not supported on this device")]
    Unsupported,
    #[error("Positioning failed: {0}")]
    Other(String),
}

/// The remote position sink rejected or dropped a report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Position report failed: {0}")]
    Failed(String),
    #[error("Position report timed out")]
    Timeout,
}

/// Lodging a violation complaint failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Violation notification failed: {0}")]
    Failed(String),
    #[error("Violation notification timed out")]
    Timeout,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Assignment {0} not found")]
    NotFound(Uuid),
    #[error("Invalid assignment request: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReporterError {
    #[error("Location reporter is already running")]
    AlreadyRunning,
    #[error("Sampling interval must be greater than zero")]
    InvalidInterval,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}
