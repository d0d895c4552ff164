//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregator::{NonNumericPolicy, StatKind, StatsAggregator};
use crate::error::ConfigError;
use crate::query::QueryRuntimeConfig;

/// Top-level configuration of the query side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Query worker pool.
    pub runtime: QueryRuntimeConfig,
    /// How statistics treat values that do not read as numbers.
    pub non_numeric: NonNumericPolicy,
}

impl LiveConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    /// `Parse` for malformed JSON, `InvalidValue` for rejected values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`from_json_str`](Self::from_json_str).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// # Errors
    /// `InvalidValue` for zero workers or a zero-capacity queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runtime.validate()
    }

    /// A statistic using the configured non-numeric policy.
    #[must_use]
    pub fn aggregator(&self, kind: StatKind, attribute: Option<&str>) -> StatsAggregator {
        StatsAggregator::new(kind, attribute.map(str::to_string)).with_policy(self.non_numeric)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = LiveConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LiveConfig::default());
        assert_eq!(config.runtime.workers, 2);
        assert_eq!(config.non_numeric, NonNumericPolicy::Zero);
    }

    #[test]
    fn test_partial_override() {
        let config =
            LiveConfig::from_json_str(r#"{"runtime": {"queue_capacity": 8}, "non_numeric": "skip"}"#).unwrap();
        assert_eq!(config.runtime.queue_capacity, 8);
        assert_eq!(config.runtime.workers, 2);
        assert_eq!(config.non_numeric, NonNumericPolicy::Skip);

        let aggregator = config.aggregator(StatKind::Sum, Some("latency"));
        assert_eq!(aggregator.policy(), NonNumericPolicy::Skip);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let err = LiveConfig::from_json_str(r#"{"runtime": {"workers": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "runtime.workers"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = LiveConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"runtime": {{"workers": 3}}}}"#).unwrap();
        let config = LiveConfig::from_path(file.path()).unwrap();
        assert_eq!(config.runtime.workers, 3);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = LiveConfig::from_path(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { ref path, .. } if path == &missing));
    }
}
