use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum TrafficError {
    #[error("Unknown device family: {0}")]
    UnknownFamily(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

/// Failure of a single observer during a fan-out pass.
///
/// These never escape `TrafficStatus::notify_observers`; they are collected
/// into the pass's `NotificationReport` instead.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("observed traffic status no longer exists")]
    StatusDropped,

    #[error("observer rejected notification: {0}")]
    Rejected(String),

    #[error("observer panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, TrafficError>;
