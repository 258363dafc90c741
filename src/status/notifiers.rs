//! Built-in observers: driver-facing and authority-facing notifiers.
//!
//! Both keep a snapshot of what they last saw, taken when the status fans
//! out. Between passes the snapshot is deliberately stale.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::{ObserverId, TrafficObserver, TrafficStatus};
use crate::error::NotifyError;

/// Value of [`AuthorityNotifier::last_seen_incident`] before any incident
/// was recorded.
pub const NO_INCIDENT_YET: &str = "no incident yet";

/// Tells drivers how congested the network is.
pub struct DriverNotifier {
    status: Weak<TrafficStatus>,
    last_seen_congestion: AtomicU32,
}

impl DriverNotifier {
    pub fn new(status: &Arc<TrafficStatus>) -> Self {
        Self {
            status: Arc::downgrade(status),
            last_seen_congestion: AtomicU32::new(0),
        }
    }

    /// Create a notifier and register it with `status`.
    pub fn attach(status: &Arc<TrafficStatus>) -> (Arc<Self>, ObserverId) {
        let notifier = Arc::new(Self::new(status));
        let id = status.add_observer(&notifier);
        (notifier, id)
    }

    /// Congestion level as of the last notification.
    pub fn last_seen_congestion(&self) -> u32 {
        self.last_seen_congestion.load(Ordering::SeqCst)
    }
}

impl TrafficObserver for DriverNotifier {
    fn label(&self) -> &str {
        "driver"
    }

    fn notify(&self) -> Result<(), NotifyError> {
        let status = self.status.upgrade().ok_or(NotifyError::StatusDropped)?;
        self.last_seen_congestion
            .store(status.congestion_level(), Ordering::SeqCst);
        Ok(())
    }
}

/// Tells the traffic authority about the latest incident.
pub struct AuthorityNotifier {
    status: Weak<TrafficStatus>,
    last_seen_incident: RwLock<String>,
}

impl AuthorityNotifier {
    pub fn new(status: &Arc<TrafficStatus>) -> Self {
        Self {
            status: Arc::downgrade(status),
            last_seen_incident: RwLock::new(NO_INCIDENT_YET.to_string()),
        }
    }

    /// Create a notifier and register it with `status`.
    pub fn attach(status: &Arc<TrafficStatus>) -> (Arc<Self>, ObserverId) {
        let notifier = Arc::new(Self::new(status));
        let id = status.add_observer(&notifier);
        (notifier, id)
    }

    /// Latest incident as of the last notification, or [`NO_INCIDENT_YET`].
    pub fn last_seen_incident(&self) -> String {
        self.last_seen_incident.read().clone()
    }
}

impl TrafficObserver for AuthorityNotifier {
    fn label(&self) -> &str {
        "authority"
    }

    fn notify(&self) -> Result<(), NotifyError> {
        let status = self.status.upgrade().ok_or(NotifyError::StatusDropped)?;
        let incident = status
            .last_incident()
            .unwrap_or_else(|| NO_INCIDENT_YET.to_string());
        *self.last_seen_incident.write() = incident;
        Ok(())
    }
}
