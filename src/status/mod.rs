//! Observable traffic status.
//!
//! [`TrafficStatus`] is the subject: sensors feed it [`Reading`]s and the
//! coordinating caller fans changes out to registered [`TrafficObserver`]s.
//! Updating and notifying are separate steps so several updates can be
//! batched before one fan-out.

pub mod notifiers;
pub mod observer;
pub mod reading;
pub mod report;
pub mod traffic_status;

pub use notifiers::{AuthorityNotifier, DriverNotifier, NO_INCIDENT_YET};
pub use observer::{ObserverId, TrafficObserver};
pub use reading::Reading;
pub use report::{Delivery, NotificationOutcome, NotificationReport, ReportSummary};
pub use traffic_status::{StatusSnapshot, TrafficStatus};
