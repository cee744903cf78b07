// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::is_valid_identifier;

/// Tunables for the correlator and the wire sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum number of pick requests in flight at once (0 = unlimited).
    pub max_outstanding: usize,
    /// How many completed request ids are remembered to recognise
    /// redeliveries.
    pub completed_history: usize,
    /// Wire value forwarded when the user cancels.
    pub cancel_sentinel: String,
    /// Prefix of the wire value forwarded when marshalling fails; the reason
    /// follows it.
    pub failure_prefix: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_outstanding: 16,
            completed_history: 64,
            cancel_sentinel: String::new(),
            failure_prefix: "\0error:".into(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Write the config as pretty JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Sentinels must never be mistaken for a real identifier, and the two
    /// outcomes must stay distinguishable from each other.
    pub fn validate(&self) -> Result<()> {
        if is_valid_identifier(&self.cancel_sentinel) {
            return Err(BridgeError::Config(format!(
                "cancel_sentinel {:?} could be a real identifier; use \"\" or a NUL-led marker",
                self.cancel_sentinel
            )));
        }
        if self.failure_prefix.is_empty() {
            return Err(BridgeError::Config("failure_prefix must not be empty".into()));
        }
        if !self.failure_prefix.starts_with('\0') {
            return Err(BridgeError::Config(format!(
                "failure_prefix {:?} must start with NUL",
                self.failure_prefix
            )));
        }
        if self.cancel_sentinel.starts_with(self.failure_prefix.as_str()) {
            return Err(BridgeError::Config(
                "cancel_sentinel is indistinguishable from failure_prefix".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        BridgeConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = BridgeConfig::from_json(r#"{ "max_outstanding": 2 }"#).unwrap();
        assert_eq!(config.max_outstanding, 2);
        assert_eq!(config.completed_history, 64);
        assert_eq!(config.cancel_sentinel, "");
    }

    #[test]
    fn identifier_like_cancel_sentinel_is_rejected() {
        let err = BridgeConfig::from_json(r#"{ "cancel_sentinel": "none" }"#).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn failure_prefix_must_be_nul_led() {
        let config = BridgeConfig {
            failure_prefix: "error:".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlapping_sentinels_are_rejected() {
        let config = BridgeConfig {
            cancel_sentinel: "\0error:cancelled".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        let config = BridgeConfig {
            max_outstanding: 4,
            cancel_sentinel: "\0cancelled".into(),
            ..Default::default()
        };
        config.persist(&path).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
