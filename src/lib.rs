//! Traffic control coordination core.
//!
//! - [`devices`]: family-consistent sensor/actuator factories
//! - [`status`]: the observable traffic status and its notifiers
//! - [`manager`]: the process-wide control manager
//! - [`control`]: one pass of the control loop tying them together

pub mod config;
pub mod control;
pub mod devices;
pub mod error;
pub mod manager;
pub mod simulation;
pub mod status;

pub use control::{CycleOutcome, TrafficController};
pub use devices::{Actuator, DeviceFactory, DeviceFamily, Sensor};
pub use error::{NotifyError, Result, TrafficError};
pub use manager::{ControlManager, MAX_CONGESTION_METRIC, MetricValue};
pub use status::{AuthorityNotifier, DriverNotifier, Reading, TrafficObserver, TrafficStatus};
