//! One pass of the traffic control loop.
//!
//! read sensor -> update status and fan out -> compare against the
//! `maxCongestionLevel` metric -> fire an actuator -> record it in the log.

use log::{debug, info};

use crate::devices::{ControlResult, DeviceFactory};
use crate::manager::{ControlManager, MAX_CONGESTION_METRIC};
use crate::status::{NotificationReport, Reading};

/// Result of [`TrafficController::run_cycle`].
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub reading: Reading,
    pub report: NotificationReport,
    /// Threshold in force during the cycle, if one was configured.
    pub threshold: Option<i64>,
    /// Set when an actuator fired.
    pub action: Option<ControlResult>,
}

/// Drives sensors and actuators of one family against a manager.
pub struct TrafficController<'a> {
    manager: &'a ControlManager,
    factory: DeviceFactory,
}

impl<'a> TrafficController<'a> {
    pub fn new(manager: &'a ControlManager, factory: DeviceFactory) -> Self {
        Self { manager, factory }
    }

    pub fn manager(&self) -> &'a ControlManager {
        self.manager
    }

    pub fn factory(&self) -> &DeviceFactory {
        &self.factory
    }

    pub fn run_cycle(&self) -> CycleOutcome {
        let sensor = self.factory.create_sensor();
        let reading = sensor.collect_data();

        let report = self.manager.stat().update_and_notify(&reading);
        // Other controllers may update the shared status as soon as the
        // pass ends; decide on this cycle's own reading.
        let level = reading.congestion_level;

        let threshold = self.manager.metric_i64(MAX_CONGESTION_METRIC);
        let action = match threshold {
            Some(max) if i64::from(level) > max => Some(self.actuate(level, max)),
            Some(_) => None,
            None => {
                debug!(
                    "[Control] No {} metric set, skipping actuation",
                    MAX_CONGESTION_METRIC
                );
                None
            }
        };

        CycleOutcome {
            reading,
            report,
            threshold,
            action,
        }
    }

    fn actuate(&self, level: u32, max: i64) -> ControlResult {
        info!(
            "[Control] Congestion {} exceeds {}, triggering {} actuator",
            level,
            max,
            self.factory.family()
        );
        let result = self.factory.create_actuator().perform_action();
        self.manager.log_action(format!(
            "actuator triggered: {:?} by {} actuator {} (congestion {} > {})",
            result.action, result.family, result.actuator_id, level, max
        ));
        result
    }
}
