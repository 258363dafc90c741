//! Traffic status subject.
//!
//! Holds the current congestion level, the append-only incident log and the
//! observer registry. The registry stores weak references keyed by
//! [`ObserverId`], so the status never owns its observers and observers never
//! keep the status alive.
//!
//! # Locking
//! - `state` guards congestion level and incidents (readers take it shared).
//! - `registry` guards registrations; it is only held long enough to copy
//!   the current registrations, never while an observer runs.
//! - `fanout` serializes every update and every notification pass, so an
//!   observer reading the status during a pass sees exactly the state the
//!   pass was started for. It is reentrant so that an observer calling back
//!   into `update_status` or `notify_observers` is refused instead of
//!   deadlocking; the refusal shows up as a failure in the pass's report.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use log::{debug, warn};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::Serialize;

use super::{
    Delivery, NotificationOutcome, NotificationReport, ObserverId, Reading, TrafficObserver,
};
use crate::error::NotifyError;

#[derive(Debug, Default)]
struct StatusState {
    congestion_level: u32,
    incidents: Vec<String>,
}

struct Registration {
    id: ObserverId,
    observer: Weak<dyn TrafficObserver>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Registration>,
}

/// Consistent copy of the status values at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub congestion_level: u32,
    pub last_incident: Option<String>,
    pub incident_count: usize,
}

/// Fan-out bookkeeping, only touched by the thread holding `fanout`.
#[derive(Default)]
struct PassState {
    in_pass: Cell<bool>,
    reentered: Cell<bool>,
}

pub struct TrafficStatus {
    state: RwLock<StatusState>,
    registry: Mutex<Registry>,
    fanout: ReentrantMutex<PassState>,
}

impl TrafficStatus {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StatusState::default()),
            registry: Mutex::new(Registry::default()),
            fanout: ReentrantMutex::new(PassState::default()),
        }
    }

    /// Register `observer` for future notification passes.
    ///
    /// Registering the same observer twice is allowed and gets it notified
    /// twice per pass.
    pub fn add_observer<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: TrafficObserver + 'static,
    {
        let weak: Weak<O> = Arc::downgrade(observer);
        let weak: Weak<dyn TrafficObserver> = weak;
        let mut registry = self.registry.lock();
        let id = ObserverId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push(Registration { id, observer: weak });
        debug!("[Status] Registered {} ({})", id, observer.label());
        id
    }

    /// Remove a registration. Returns whether one was removed; removing an
    /// unknown or already removed handle is a no-op.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.entries.len();
        registry.entries.retain(|r| r.id != id);
        let removed = registry.entries.len() != before;
        if removed {
            debug!("[Status] Removed {}", id);
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Apply a reading without notifying anyone.
    ///
    /// The congestion level is replaced; an incident, if present, is
    /// appended to the incident log.
    ///
    /// Called from inside an observer's `notify`, the update is ignored and
    /// that observer is reported as failed.
    pub fn update_status(&self, reading: &Reading) {
        if let Some(_pass) = self.enter("update_status") {
            self.apply(reading);
        }
    }

    /// Notify every registered observer, in registration order.
    ///
    /// A failing or panicking observer does not stop the pass; its failure
    /// is logged and recorded in the returned report. Observers that were
    /// dropped without being removed are reported as [`Delivery::Dropped`]
    /// and pruned.
    ///
    /// Called from inside an observer's `notify`, nothing is notified, an
    /// empty report is returned and the calling observer is reported as
    /// failed in the outer pass.
    pub fn notify_observers(&self) -> NotificationReport {
        match self.enter("notify_observers") {
            Some(pass) => self.fan_out(&pass),
            None => NotificationReport::default(),
        }
    }

    /// Apply a reading and notify observers as one critical section.
    pub fn update_and_notify(&self, reading: &Reading) -> NotificationReport {
        match self.enter("update_and_notify") {
            Some(pass) => {
                self.apply(reading);
                self.fan_out(&pass)
            }
            None => NotificationReport::default(),
        }
    }

    pub fn congestion_level(&self) -> u32 {
        self.state.read().congestion_level
    }

    /// Copy of the incident log, oldest first.
    pub fn incidents(&self) -> Vec<String> {
        self.state.read().incidents.clone()
    }

    pub fn last_incident(&self) -> Option<String> {
        self.state.read().incidents.last().cloned()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.read();
        StatusSnapshot {
            congestion_level: state.congestion_level,
            last_incident: state.incidents.last().cloned(),
            incident_count: state.incidents.len(),
        }
    }

    /// Take the fan-out lock, or `None` when this thread is already inside
    /// a notification pass on this status.
    fn enter(&self, operation: &str) -> Option<ReentrantMutexGuard<'_, PassState>> {
        let pass = self.fanout.lock();
        if pass.in_pass.get() {
            pass.reentered.set(true);
            warn!("[Status] Refused {} from inside a notification pass", operation);
            return None;
        }
        Some(pass)
    }

    fn apply(&self, reading: &Reading) {
        let mut state = self.state.write();
        state.congestion_level = reading.congestion_level;
        if let Some(incident) = &reading.incident {
            state.incidents.push(incident.clone());
        }
        debug!(
            "[Status] Congestion level {} ({} incidents recorded)",
            state.congestion_level,
            state.incidents.len()
        );
    }

    fn fan_out(&self, pass: &PassState) -> NotificationReport {
        // Copy registrations so observers may (de)register during the pass;
        // such changes apply from the next pass on.
        let targets: Vec<(ObserverId, Weak<dyn TrafficObserver>)> = self
            .registry
            .lock()
            .entries
            .iter()
            .map(|r| (r.id, r.observer.clone()))
            .collect();

        let mut report = NotificationReport::default();
        pass.in_pass.set(true);
        for (id, weak) in targets {
            let outcome = match weak.upgrade() {
                Some(observer) => {
                    let label = observer.label().to_string();
                    pass.reentered.set(false);
                    let result = deliver(observer.as_ref()).and_then(|()| {
                        if pass.reentered.get() {
                            Err(NotifyError::Rejected(
                                "re-entered traffic status during notification".to_string(),
                            ))
                        } else {
                            Ok(())
                        }
                    });
                    let delivery = match result {
                        Ok(()) => Delivery::Delivered,
                        Err(err) => {
                            warn!("[Status] {} ({}) failed: {}", id, label, err);
                            Delivery::Failed(err)
                        }
                    };
                    NotificationOutcome {
                        id,
                        label: Some(label),
                        delivery,
                    }
                }
                None => NotificationOutcome {
                    id,
                    label: None,
                    delivery: Delivery::Dropped,
                },
            };
            report.push(outcome);
        }
        pass.in_pass.set(false);

        let dropped = report.dropped();
        if !dropped.is_empty() {
            self.registry
                .lock()
                .entries
                .retain(|r| !dropped.contains(&r.id));
            debug!("[Status] Pruned {} dropped observers", dropped.len());
        }

        debug!("[Status] Fan-out finished: {:?}", report.summary());
        report
    }
}

impl Default for TrafficStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(observer: &dyn TrafficObserver) -> Result<(), NotifyError> {
    panic::catch_unwind(AssertUnwindSafe(|| observer.notify())).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(NotifyError::Panicked(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    /// Records the order in which observers were notified.
    struct Recorder {
        name: String,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(name: &str, journal: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                journal: Arc::clone(journal),
            })
        }
    }

    impl TrafficObserver for Recorder {
        fn label(&self) -> &str {
            &self.name
        }

        fn notify(&self) -> Result<(), NotifyError> {
            self.journal.lock().push(self.name.clone());
            Ok(())
        }
    }

    struct Failing;

    impl TrafficObserver for Failing {
        fn label(&self) -> &str {
            "failing"
        }

        fn notify(&self) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected("display offline".to_string()))
        }
    }

    struct Panicking;

    impl TrafficObserver for Panicking {
        fn label(&self) -> &str {
            "panicking"
        }

        fn notify(&self) -> Result<(), NotifyError> {
            panic!("sign controller crashed");
        }
    }

    #[test]
    fn test_initial_state() {
        let status = TrafficStatus::new();
        assert_eq!(status.congestion_level(), 0);
        assert!(status.incidents().is_empty());
        assert_eq!(status.last_incident(), None);
        assert_eq!(status.observer_count(), 0);
        assert!(status.notify_observers().is_empty());
    }

    #[test]
    fn test_notifies_in_registration_order() {
        let status = TrafficStatus::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let o1 = Recorder::new("o1", &journal);
        let o2 = Recorder::new("o2", &journal);
        let id1 = status.add_observer(&o1);
        let id2 = status.add_observer(&o2);

        let report = status.notify_observers();
        assert_eq!(*journal.lock(), vec!["o1", "o2"]);
        assert_eq!(report.delivered(), vec![id1, id2]);
        assert!(report.is_clean());
    }

    #[test]
    fn test_removed_observer_is_not_notified() {
        let status = TrafficStatus::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let o1 = Recorder::new("o1", &journal);
        let o2 = Recorder::new("o2", &journal);
        status.add_observer(&o1);
        let id2 = status.add_observer(&o2);

        assert!(status.remove_observer(id2));
        status.notify_observers();
        assert_eq!(*journal.lock(), vec!["o1"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let status = TrafficStatus::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let id = status.add_observer(&Recorder::new("o1", &journal));
        assert!(status.remove_observer(id));
        assert!(!status.remove_observer(id));
        assert_eq!(status.observer_count(), 0);
    }

    #[test]
    fn test_duplicate_registration_notifies_twice() {
        let status = TrafficStatus::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let o1 = Recorder::new("o1", &journal);
        let first = status.add_observer(&o1);
        let second = status.add_observer(&o1);
        assert_ne!(first, second);

        status.notify_observers();
        assert_eq!(*journal.lock(), vec!["o1", "o1"]);
    }

    #[test]
    fn test_update_does_not_notify() {
        let status = TrafficStatus::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let o1 = Recorder::new("o1", &journal);
        status.add_observer(&o1);

        status.update_status(&Reading::new(3));
        status.update_status(&Reading::new(5));
        assert!(journal.lock().is_empty());
        assert_eq!(status.congestion_level(), 5);

        status.notify_observers();
        assert_eq!(journal.lock().len(), 1);
    }

    #[test]
    fn test_incidents_append_in_call_order() {
        let status = TrafficStatus::new();
        let k = 6;
        for i in 0..k {
            status.update_status(&Reading::with_incident(i, format!("incident {}", i)));
        }
        status.update_status(&Reading::new(2));

        let expected: Vec<String> = (0..k).map(|i| format!("incident {}", i)).collect();
        assert_eq!(status.incidents(), expected);
        assert_eq!(status.congestion_level(), 2);

        let snapshot = status.snapshot();
        assert_eq!(snapshot.incident_count, k as usize);
        assert_eq!(snapshot.last_incident.as_deref(), Some("incident 5"));
    }

    #[test]
    fn test_failures_are_isolated_and_reported() {
        let status = TrafficStatus::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(Failing);
        let panicking = Arc::new(Panicking);
        let after = Recorder::new("after", &journal);
        let failing_id = status.add_observer(&failing);
        let panicking_id = status.add_observer(&panicking);
        let after_id = status.add_observer(&after);

        let report = status.notify_observers();
        assert_eq!(*journal.lock(), vec!["after"]);
        assert_eq!(report.delivered(), vec![after_id]);
        assert!(!report.is_clean());

        let failures: Vec<_> = report.failures().map(|(o, e)| (o.id, e.clone())).collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures[0],
            (failing_id, NotifyError::Rejected("display offline".to_string()))
        );
        assert_eq!(
            failures[1],
            (
                panicking_id,
                NotifyError::Panicked("sign controller crashed".to_string())
            )
        );
    }

    #[test]
    fn test_dropped_observer_is_reported_and_pruned() {
        let status = TrafficStatus::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let kept = Recorder::new("kept", &journal);
        let gone = Recorder::new("gone", &journal);
        status.add_observer(&kept);
        let gone_id = status.add_observer(&gone);
        drop(gone);

        let report = status.notify_observers();
        assert_eq!(report.dropped(), vec![gone_id]);
        assert_eq!(report.summary().delivered, 1);
        assert_eq!(status.observer_count(), 1);

        let report = status.notify_observers();
        assert!(report.is_clean());
        assert_eq!(report.len(), 1);
    }

    /// Registers a fresh recorder while being notified.
    struct Recruiter {
        status: Arc<TrafficStatus>,
        recruit: Arc<Recorder>,
    }

    impl TrafficObserver for Recruiter {
        fn label(&self) -> &str {
            "recruiter"
        }

        fn notify(&self) -> Result<(), NotifyError> {
            self.status.add_observer(&self.recruit);
            Ok(())
        }
    }

    #[test]
    fn test_registration_during_pass_applies_next_pass() {
        let status = Arc::new(TrafficStatus::new());
        let journal = Arc::new(Mutex::new(Vec::new()));
        let recruiter = Arc::new(Recruiter {
            status: Arc::clone(&status),
            recruit: Recorder::new("recruit", &journal),
        });
        let recruiter_id = status.add_observer(&recruiter);

        let report = status.notify_observers();
        assert_eq!(report.len(), 1);
        assert!(journal.lock().is_empty());

        status.remove_observer(recruiter_id);
        status.notify_observers();
        assert_eq!(*journal.lock(), vec!["recruit"]);
    }

    enum Callback {
        Update,
        Notify,
    }

    /// Calls back into the status it is watching while being notified.
    struct Reentrant {
        status: Weak<TrafficStatus>,
        callback: Callback,
    }

    impl TrafficObserver for Reentrant {
        fn label(&self) -> &str {
            "reentrant"
        }

        fn notify(&self) -> Result<(), NotifyError> {
            let status = self.status.upgrade().ok_or(NotifyError::StatusDropped)?;
            match self.callback {
                Callback::Update => status.update_status(&Reading::with_incident(99, "echo")),
                Callback::Notify => assert!(status.notify_observers().is_empty()),
            }
            Ok(())
        }
    }

    #[test]
    fn test_reentrant_update_is_refused_and_reported() {
        let status = Arc::new(TrafficStatus::new());
        let journal = Arc::new(Mutex::new(Vec::new()));
        let reentrant = Arc::new(Reentrant {
            status: Arc::downgrade(&status),
            callback: Callback::Update,
        });
        let after = Recorder::new("after", &journal);
        let reentrant_id = status.add_observer(&reentrant);
        let after_id = status.add_observer(&after);

        let report = status.update_and_notify(&Reading::new(4));

        assert_eq!(report.delivered(), vec![after_id]);
        let failures: Vec<_> = report.failures().map(|(o, _)| o.id).collect();
        assert_eq!(failures, vec![reentrant_id]);
        assert!(matches!(
            report.failures().next(),
            Some((_, NotifyError::Rejected(_)))
        ));
        assert_eq!(status.congestion_level(), 4);
        assert!(status.incidents().is_empty());
    }

    #[test]
    fn test_reentrant_notify_is_refused_and_reported() {
        let status = Arc::new(TrafficStatus::new());
        let reentrant = Arc::new(Reentrant {
            status: Arc::downgrade(&status),
            callback: Callback::Notify,
        });
        status.add_observer(&reentrant);

        let report = status.notify_observers();
        assert_eq!(report.summary().failed, 1);

        // The status is usable again once the pass is over.
        status.update_status(&Reading::new(2));
        assert_eq!(status.congestion_level(), 2);
        let report = status.notify_observers();
        assert_eq!(report.summary().failed, 1);
    }

    /// Checks that level and latest incident always come from the same update.
    struct ConsistencyCheck {
        status: Weak<TrafficStatus>,
        torn: Mutex<u32>,
    }

    impl TrafficObserver for ConsistencyCheck {
        fn label(&self) -> &str {
            "consistency"
        }

        fn notify(&self) -> Result<(), NotifyError> {
            let status = self.status.upgrade().ok_or(NotifyError::StatusDropped)?;
            let level = status.congestion_level();
            let incident = status.last_incident();
            if incident != Some(format!("level {}", level)) {
                *self.torn.lock() += 1;
            }
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_update_and_notify_never_tears() {
        let status = Arc::new(TrafficStatus::new());
        let check = Arc::new(ConsistencyCheck {
            status: Arc::downgrade(&status),
            torn: Mutex::new(0),
        });
        status.add_observer(&check);

        let threads = 8;
        let per_thread = 50;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let status = Arc::clone(&status);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..per_thread {
                        let level = (t * per_thread + i) as u32;
                        let reading = Reading::with_incident(level, format!("level {}", level));
                        assert!(status.update_and_notify(&reading).is_clean());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*check.torn.lock(), 0);
        assert_eq!(status.incidents().len(), threads * per_thread);
    }
}
