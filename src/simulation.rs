//! Simulated control loop for development and testing.

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

use crate::control::TrafficController;

/// Spawn a task that runs a control cycle every `period`.
///
/// Stops after `cycles` cycles, or runs until aborted when `cycles` is
/// `None`. The task resolves to the number of cycles that actuated.
pub fn run_traffic_simulation(
    controller: TrafficController<'static>,
    period: Duration,
    cycles: Option<u64>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        let mut completed = 0u64;
        let mut actuated = 0u64;
        while cycles.is_none_or(|limit| completed < limit) {
            ticker.tick().await;
            let outcome = controller.run_cycle();
            completed += 1;

            info!(
                "[Sim] Cycle {}: congestion {}{}",
                completed,
                outcome.reading.congestion_level,
                outcome
                    .reading
                    .incident
                    .as_deref()
                    .map(|i| format!(", incident: {}", i))
                    .unwrap_or_default()
            );
            for (failed, err) in outcome.report.failures() {
                warn!("[Sim] Observer {} not notified: {}", failed.id, err);
            }
            if outcome.action.is_some() {
                actuated += 1;
            }
        }
        actuated
    })
}
