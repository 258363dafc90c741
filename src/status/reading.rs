use serde::{Deserialize, Serialize};

/// Value produced by a sensor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub congestion_level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident: Option<String>,
}

impl Reading {
    pub fn new(congestion_level: u32) -> Self {
        Self {
            congestion_level,
            incident: None,
        }
    }

    pub fn with_incident(congestion_level: u32, incident: impl Into<String>) -> Self {
        Self {
            congestion_level,
            incident: Some(incident.into()),
        }
    }
}
