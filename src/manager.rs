//! Process-wide traffic control manager.
//!
//! The manager owns the one shared [`TrafficStatus`], a metrics map and an
//! append-only action log. [`ControlManager::instance`] returns the
//! process-wide manager, constructing it on first access; code that wants an
//! isolated context (tests, embedding) can create its own with
//! [`ControlManager::new`] and pass it around explicitly.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ControlConfig;
use crate::error::Result;
use crate::status::{StatusSnapshot, TrafficStatus};

/// Metric holding the congestion level above which actuators fire.
pub const MAX_CONGESTION_METRIC: &str = "maxCongestionLevel";

/// Process-wide manager, published once fully constructed.
static INSTANCE: OnceLock<ControlManager> = OnceLock::new();
/// Number of times the process-wide manager has been constructed.
static GLOBAL_CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

/// Value stored in the metrics map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Integer(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Integer(v.into())
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Integer(v.into())
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// One timestamped action log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub action: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Performed {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.action
        )
    }
}

/// Serializable copy of the manager's state, for external persistence.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub metrics: BTreeMap<String, MetricValue>,
    pub log: Vec<LogEntry>,
    pub status: StatusSnapshot,
}

impl ManagerSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Metrics and log share one lock.
#[derive(Default)]
struct Records {
    metrics: HashMap<String, MetricValue>,
    log: Vec<LogEntry>,
}

pub struct ControlManager {
    records: Mutex<Records>,
    status: Arc<TrafficStatus>,
}

impl ControlManager {
    /// Create an independent manager with its own status.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
            status: Arc::new(TrafficStatus::new()),
        }
    }

    /// The process-wide manager.
    ///
    /// Constructed on first call. Concurrent first callers block until the
    /// winner has finished constructing it, so nobody observes a partially
    /// built manager and construction happens once per process.
    pub fn instance() -> &'static ControlManager {
        INSTANCE.get_or_init(|| {
            GLOBAL_CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
            info!("[Manager] Initializing process-wide control manager");
            ControlManager::new()
        })
    }

    /// Whether the process-wide manager has been constructed yet.
    pub fn is_initialized() -> bool {
        INSTANCE.get().is_some()
    }

    /// How many times the process-wide manager has been constructed.
    pub fn global_constructions() -> usize {
        GLOBAL_CONSTRUCTIONS.load(Ordering::SeqCst)
    }

    /// Apply control settings to the metrics map.
    pub fn configure(&self, config: &ControlConfig) {
        self.adjust_metric(MAX_CONGESTION_METRIC, config.max_congestion_level);
    }

    /// Insert or overwrite a metric.
    pub fn adjust_metric(&self, key: impl Into<String>, value: impl Into<MetricValue>) {
        let key = key.into();
        let value = value.into();
        debug!("[Manager] Metric {} = {}", key, value);
        self.records.lock().metrics.insert(key, value);
    }

    pub fn metric(&self, key: &str) -> Option<MetricValue> {
        self.records.lock().metrics.get(key).cloned()
    }

    /// Integer metric, `None` if missing or not an integer.
    pub fn metric_i64(&self, key: &str) -> Option<i64> {
        self.records.lock().metrics.get(key).and_then(MetricValue::as_i64)
    }

    /// Copy of all metrics, sorted by key.
    pub fn metrics(&self) -> BTreeMap<String, MetricValue> {
        self.records
            .lock()
            .metrics
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Append a timestamped entry to the action log.
    pub fn log_action(&self, action: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Local::now(),
            action: action.into(),
        };
        info!("[Manager] {}", entry);
        self.records.lock().log.push(entry);
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.records.lock().log.clone()
    }

    pub fn log_len(&self) -> usize {
        self.records.lock().log.len()
    }

    /// The action log as text, one entry per line.
    pub fn render_log(&self) -> String {
        self.records
            .lock()
            .log
            .iter()
            .map(|entry| format!("{}\n", entry))
            .collect()
    }

    /// The shared traffic status. Every caller gets the same object.
    pub fn stat(&self) -> &Arc<TrafficStatus> {
        &self.status
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let (metrics, log) = {
            let records = self.records.lock();
            let metrics = records
                .metrics
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (metrics, records.log.clone())
        };
        ManagerSnapshot {
            metrics,
            log,
            status: self.status.snapshot(),
        }
    }
}

impl Default for ControlManager {
    fn default() -> Self {
        Self::new()
    }
}
