//! Observer capability and registration handles.

use std::fmt;

use crate::error::NotifyError;

/// Opaque handle returned by [`super::TrafficStatus::add_observer`].
///
/// Every registration gets a fresh handle, including repeated registrations
/// of the same observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Something that reacts when a traffic status fans out a change.
///
/// Implementations pull whatever they need from the status they watch.
/// `notify` runs while the status holds its fan-out lock, so it must not
/// call `update_status` or `notify_observers` on the same status.
pub trait TrafficObserver: Send + Sync {
    /// Human-readable name used in logs and notification reports.
    fn label(&self) -> &str;

    fn notify(&self) -> Result<(), NotifyError>;
}
