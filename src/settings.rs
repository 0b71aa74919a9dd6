/*!
Configuration for the network map bridge.

Everything is defaulted, so an empty JSON object is a valid configuration. Durations
are written the humantime way (`"1s"`, `"250ms"`).
*/

use std::{path::Path, time::Duration};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const DEFAULT_BASE_TOPIC: &str = "zigbee2mqtt";
const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 4;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("max_concurrent_queries must be at least 1")]
    ZeroConcurrency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix of the request and response topics.
    pub base_topic: String,
    pub collector: CollectorSettings,
    pub map_options: MapOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_topic: DEFAULT_BASE_TOPIC.to_string(),
            collector: CollectorSettings::default(),
            map_options: MapOptions::default(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.collector.max_concurrent_queries == 0 {
            return Err(SettingsError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// How the topology collector talks to the devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// Devices scanned at the same time. 1 scans sequentially.
    pub max_concurrent_queries: usize,
    /// Pause before the single retry of a failed query.
    #[serde(with = "humantime_duration")]
    pub retry_delay: Duration,
    /// Upper bound for one query on top of whatever the transport enforces.
    #[serde(with = "humantime_duration_opt")]
    pub query_timeout: Option<Duration>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            query_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub graphviz: GraphvizOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphvizOptions {
    pub colors: GraphvizColors,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphvizColors {
    pub fill: FillColors,
    pub font: FontColors,
    pub line: LineColors,
}

/// Vertex background per device kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillColors {
    pub enddevice: String,
    pub coordinator: String,
    pub router: String,
}

impl Default for FillColors {
    fn default() -> Self {
        Self {
            enddevice: "#fff8ce".to_string(),
            coordinator: "#e04e5d".to_string(),
            router: "#4ea3e0".to_string(),
        }
    }
}

/// Label colour per device kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontColors {
    pub enddevice: String,
    pub coordinator: String,
    pub router: String,
}

impl Default for FontColors {
    fn default() -> Self {
        Self {
            enddevice: "#000000".to_string(),
            coordinator: "#ffffff".to_string(),
            router: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineColors {
    /// Links that carry at least one route.
    pub active: String,
    pub inactive: String,
}

impl Default for LineColors {
    fn default() -> Self {
        Self {
            active: "#009900".to_string(),
            inactive: "#994444".to_string(),
        }
    }
}

mod humantime_duration {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

mod humantime_duration_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.base_topic, "zigbee2mqtt");
        assert_eq!(settings.collector.retry_delay, Duration::from_secs(1));
        assert_eq!(settings.collector.query_timeout, None);
        assert_eq!(settings.map_options.graphviz.colors.fill.coordinator, "#e04e5d");
    }

    #[test]
    fn test_partial_settings() {
        let json = r##"{
            "base_topic": "mesh",
            "collector": {"max_concurrent_queries": 1, "retry_delay": "250ms", "query_timeout": "10s"},
            "map_options": {"graphviz": {"colors": {"line": {"active": "#00ff00"}}}}
        }"##;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.base_topic, "mesh");
        assert_eq!(settings.collector.max_concurrent_queries, 1);
        assert_eq!(settings.collector.retry_delay, Duration::from_millis(250));
        assert_eq!(settings.collector.query_timeout, Some(Duration::from_secs(10)));
        assert_eq!(settings.map_options.graphviz.colors.line.active, "#00ff00");
        assert_eq!(settings.map_options.graphviz.colors.line.inactive, "#994444");
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let json = r#"{"collector": {"max_concurrent_queries": 0}}"#;
        assert!(matches!(
            Settings::from_json(json),
            Err(SettingsError::ZeroConcurrency)
        ));
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let json = r#"{"collector": {"retry_delay": "soon"}}"#;
        assert!(matches!(Settings::from_json(json), Err(SettingsError::Parse(_))));
    }
}
