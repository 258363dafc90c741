//! Device family tag.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{Result, TrafficError};

/// Named category grouping a matched sensor/actuator pair.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceFamily {
    /// City intersections: signal heads and loop detectors.
    Urban,
    /// Motorway segments: gantries and radar counters.
    Highway,
}

impl DeviceFamily {
    /// Resolve a caller-supplied family key.
    ///
    /// Returns [`TrafficError::UnknownFamily`] carrying the original key when
    /// it names no known family.
    pub fn from_key(key: &str) -> Result<Self> {
        Self::from_str(key.trim()).map_err(|_| TrafficError::UnknownFamily(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_from_key_accepts_known_families() {
        assert_eq!(DeviceFamily::from_key("urban").unwrap(), DeviceFamily::Urban);
        assert_eq!(
            DeviceFamily::from_key(" Highway ").unwrap(),
            DeviceFamily::Highway
        );
    }

    #[test]
    fn test_from_key_rejects_unknown_family() {
        match DeviceFamily::from_key("rural") {
            Err(TrafficError::UnknownFamily(key)) => assert_eq!(key, "rural"),
            other => panic!("expected UnknownFamily, got {:?}", other),
        }
    }

    #[test]
    fn test_display_round_trips_through_from_key() {
        for family in DeviceFamily::iter() {
            assert_eq!(DeviceFamily::from_key(&family.to_string()).unwrap(), family);
        }
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&DeviceFamily::Highway).unwrap();
        assert_eq!(json, "\"highway\"");
    }
}
