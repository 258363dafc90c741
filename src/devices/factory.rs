//! Family-consistent device factory.

use std::fmt;
use std::sync::Arc;

use super::{Actuator, DeviceFamily, IdleSource, ReadingSource, Sensor};
use crate::error::Result;

/// Produces sensors and actuators of exactly one family.
///
/// Cloning a factory is cheap; clones share the reading source.
#[derive(Clone)]
pub struct DeviceFactory {
    family: DeviceFamily,
    source: Arc<dyn ReadingSource>,
}

impl DeviceFactory {
    /// Factory whose sensors read from an [`IdleSource`].
    pub fn new(family: DeviceFamily) -> Self {
        Self::with_source(family, Arc::new(IdleSource))
    }

    /// Factory whose sensors read from `source`.
    pub fn with_source(family: DeviceFamily, source: Arc<dyn ReadingSource>) -> Self {
        Self { family, source }
    }

    /// Select a factory by family key, e.g. `"urban"`.
    ///
    /// Fails with `UnknownFamily` for keys naming no family.
    pub fn for_key(key: &str) -> Result<Self> {
        DeviceFamily::from_key(key).map(Self::new)
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn create_sensor(&self) -> Sensor {
        Sensor::new(self.family, Arc::clone(&self.source))
    }

    pub fn create_actuator(&self) -> Actuator {
        Actuator::new(self.family)
    }
}

impl fmt::Debug for DeviceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceFactory")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}
