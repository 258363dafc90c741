//! Traffic actuator.

use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DeviceFamily;

/// Control action an actuator carries out, fixed by its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    /// Extend green phases on congested approaches.
    RetimeSignals,
    /// Drop the variable speed limit on the affected segment.
    LowerSpeedLimit,
}

impl ControlAction {
    pub fn for_family(family: DeviceFamily) -> Self {
        match family {
            DeviceFamily::Urban => ControlAction::RetimeSignals,
            DeviceFamily::Highway => ControlAction::LowerSpeedLimit,
        }
    }
}

/// Outcome of one actuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResult {
    pub actuator_id: Uuid,
    pub family: DeviceFamily,
    pub action: ControlAction,
    pub performed_at: DateTime<Local>,
}

/// Short-lived actuator handle produced by a [`super::DeviceFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actuator {
    id: Uuid,
    family: DeviceFamily,
}

impl Actuator {
    pub(crate) fn new(family: DeviceFamily) -> Self {
        Self {
            id: Uuid::new_v4(),
            family,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// Carry out this actuator's control action.
    pub fn perform_action(&self) -> ControlResult {
        let action = ControlAction::for_family(self.family);
        info!(
            "[Actuator] {} actuator {} performing {:?}",
            self.family, self.id, action
        );
        ControlResult {
            actuator_id: self.id,
            family: self.family,
            action,
            performed_at: Local::now(),
        }
    }
}
