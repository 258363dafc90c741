//! Reading sources backing sensors.
//!
//! Real sensor I/O lives outside this crate. A [`ReadingSource`] is the seam
//! where caller code plugs that I/O in; the sources here cover idle devices,
//! fixed stubs and a random simulation.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::DeviceFamily;
use crate::status::Reading;

/// Produces readings for sensors of a given family.
pub trait ReadingSource: Send + Sync {
    /// Take one reading on behalf of a sensor of `family`.
    fn read(&self, family: DeviceFamily) -> Reading;
}

/// Source for sensors with nothing attached: free-flowing, no incidents.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleSource;

impl ReadingSource for IdleSource {
    fn read(&self, _family: DeviceFamily) -> Reading {
        Reading::default()
    }
}

/// Source that always returns the same reading.
#[derive(Debug, Clone)]
pub struct FixedSource(pub Reading);

impl ReadingSource for FixedSource {
    fn read(&self, _family: DeviceFamily) -> Reading {
        self.0.clone()
    }
}

const URBAN_INCIDENTS: &[&str] = &[
    "collision at intersection",
    "signal failure",
    "lane blocked by delivery vehicle",
    "pedestrian on carriageway",
];

const HIGHWAY_INCIDENTS: &[&str] = &[
    "multi-vehicle collision",
    "debris on carriageway",
    "broken-down vehicle on hard shoulder",
    "wrong-way driver reported",
];

/// Highest congestion level the simulation produces.
pub const MAX_SIMULATED_CONGESTION: u32 = 10;

/// Random readings for development and testing.
///
/// Congestion is uniform over `0..=MAX_SIMULATED_CONGESTION`; roughly one
/// reading in `incident_one_in` carries a family-specific incident.
pub struct SimulatedSource {
    rng: Mutex<StdRng>,
    incident_one_in: u32,
}

impl SimulatedSource {
    /// Create a simulation, deterministic when `seed` is given.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            incident_one_in: 4,
        }
    }

    /// Override how rarely incidents occur. Values below 1 are clamped to 1.
    pub fn with_incident_rate(mut self, one_in: u32) -> Self {
        self.incident_one_in = one_in.max(1);
        self
    }
}

impl ReadingSource for SimulatedSource {
    fn read(&self, family: DeviceFamily) -> Reading {
        let mut rng = self.rng.lock();
        let level = rng.gen_range(0..=MAX_SIMULATED_CONGESTION);
        let incidents = match family {
            DeviceFamily::Urban => URBAN_INCIDENTS,
            DeviceFamily::Highway => HIGHWAY_INCIDENTS,
        };
        let incident = if rng.gen_ratio(1, self.incident_one_in) {
            incidents.choose(&mut *rng).map(|s| s.to_string())
        } else {
            None
        };
        Reading {
            congestion_level: level,
            incident,
        }
    }
}
