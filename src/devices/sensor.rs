//! Traffic sensor.

use std::fmt;
use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use super::{DeviceFamily, ReadingSource};
use crate::status::Reading;

/// Short-lived sensor handle produced by a [`super::DeviceFactory`].
///
/// Holds no shared mutable state of its own; readings come from the
/// factory's [`ReadingSource`].
pub struct Sensor {
    id: Uuid,
    family: DeviceFamily,
    source: Arc<dyn ReadingSource>,
}

impl Sensor {
    pub(crate) fn new(family: DeviceFamily, source: Arc<dyn ReadingSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            family,
            source,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// Take a reading.
    pub fn collect_data(&self) -> Reading {
        let reading = self.source.read(self.family);
        debug!(
            "[Sensor] {} sensor {} read congestion {} (incident: {:?})",
            self.family, self.id, reading.congestion_level, reading.incident
        );
        reading
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("id", &self.id)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}
