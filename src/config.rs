use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::devices::DeviceFamily;
use crate::error::{Result, TrafficError};

/// Load environment variables from .env file.
/// Variables already present in the environment win.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            // SAFETY: called from main before the runtime or any other thread starts
            unsafe { std::env::set_var(&key, value) };
        }
    }
}

/// Parse `KEY=value` lines, skipping blanks and comments.
/// Values may contain spaces and may be wrapped in single or double quotes.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            if !key.is_empty() {
                vars.push((key.to_string(), value.to_string()));
            }
        }
    }
    vars
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub control: ControlConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Device family the control loop drives.
    pub family: DeviceFamily,
    /// Congestion level above which actuators fire.
    pub max_congestion_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub interval_ms: u64,
    /// Number of control cycles to run; `None` runs until interrupted.
    pub cycles: Option<u64>,
    /// Seed for reproducible simulated readings.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            simulation: SimulationConfig {
                interval_ms: 1000,
                cycles: Some(10),
                seed: None,
            },
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            family: DeviceFamily::Urban,
            max_congestion_level: 8,
        }
    }
}

impl Config {
    /// Defaults overridden by `TRAFFIC_*` environment variables.
    ///
    /// Fails if `TRAFFIC_FAMILY` names an unknown family; other malformed
    /// numeric values are ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(family) = lookup("TRAFFIC_FAMILY") {
            config.control.family = DeviceFamily::from_key(&family)?;
        }
        if let Some(level) = lookup("TRAFFIC_MAX_CONGESTION")
            && let Ok(l) = level.parse()
        {
            config.control.max_congestion_level = l;
        }
        if let Some(interval) = lookup("TRAFFIC_INTERVAL_MS")
            && let Ok(i) = interval.parse()
        {
            config.simulation.interval_ms = i;
        }
        if let Some(cycles) = lookup("TRAFFIC_CYCLES")
            && let Ok(c) = cycles.parse::<u64>()
        {
            // 0 means run until interrupted
            config.simulation.cycles = (c > 0).then_some(c);
        }
        if let Some(seed) = lookup("TRAFFIC_SEED")
            && let Ok(s) = seed.parse()
        {
            config.simulation.seed = Some(s);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulation.interval_ms == 0 {
            return Err(TrafficError::InvalidConfig(
                "simulation interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
