// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the picker result bridge.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Unique identifier for an outstanding pick request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| BridgeError::InvalidRequestId(format!("{s:?}: {e}")))
    }
}

/// One outstanding "ask the user to pick a resource" operation.
#[derive(Debug, Clone)]
pub struct PickRequest {
    pub id: RequestId,
    /// Flips to `true` exactly once, under the correlator lock.
    pub completed: bool,
    pub started_at: DateTime<Utc>,
}

impl PickRequest {
    pub fn new() -> Self {
        Self {
            id: RequestId::new(),
            completed: false,
            started_at: Utc::now(),
        }
    }

    /// Mark the request complete. Returns `false` if it already was.
    pub fn complete(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        true
    }
}

impl Default for PickRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal outcome of a pick request as reported by the platform.
///
/// `U` is whatever the platform hands back for a selection (a JNI `Uri`, a
/// desktop path, a plain string). It stays opaque until the forwarder
/// marshals it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickResult<U = String> {
    Selected(U),
    Cancelled,
}

impl<U> PickResult<U> {
    /// `None` from the platform means the user dismissed the dialog.
    pub fn from_option(value: Option<U>) -> Self {
        match value {
            Some(u) => Self::Selected(u),
            None => Self::Cancelled,
        }
    }
}

/// Whether `s` can travel as a real identifier.
///
/// Empty strings and strings containing NUL are reserved for the cancel and
/// failure sentinels.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && !s.contains('\0')
}

/// The value that actually crossed the native sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "kebab-case")]
pub enum ForwardedValue {
    /// A real identifier, forwarded verbatim.
    Selected(String),
    /// The user cancelled or the request was abandoned.
    NoSelection,
    /// Marshalling failed; carries the reason.
    Failed(String),
}

impl ForwardedValue {
    /// Render the wire string handed to the native entry point.
    pub fn to_wire(&self, config: &BridgeConfig) -> String {
        match self {
            Self::Selected(id) => id.clone(),
            Self::NoSelection => config.cancel_sentinel.clone(),
            Self::Failed(reason) => {
                // Reasons never carry NUL; only the prefix does.
                let reason = reason.replace('\0', " ");
                format!("{}{reason}", config.failure_prefix)
            }
        }
    }

    /// Classify a wire string received by the native side.
    pub fn from_wire(wire: &str, config: &BridgeConfig) -> Self {
        if wire == config.cancel_sentinel {
            Self::NoSelection
        } else if let Some(reason) = wire.strip_prefix(config.failure_prefix.as_str()) {
            Self::Failed(reason.to_string())
        } else {
            Self::Selected(wire.to_string())
        }
    }

    pub fn is_selection(&self) -> bool {
        matches!(self, Self::Selected(_))
    }
}

/// Why a delivery attempt did not reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The request already completed; benign platform redelivery.
    DuplicateDelivery,
    /// The request was never started here, or aged out of the history.
    UnknownRequest,
}

/// Outcome of a successful `on_result` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Forwarded(ForwardedValue),
    Ignored(IgnoreReason),
}

impl Delivery {
    pub fn was_forwarded(&self) -> bool {
        matches!(self, Self::Forwarded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_parses_its_display_form() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn garbage_request_id_is_rejected() {
        let err = "not-a-uuid".parse::<RequestId>().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidRequestId(_)));
    }

    #[test]
    fn pick_request_completes_once() {
        let mut req = PickRequest::new();
        assert!(req.complete());
        assert!(!req.complete());
        assert!(req.completed);
    }

    #[test]
    fn none_from_platform_is_cancellation() {
        assert_eq!(PickResult::<String>::from_option(None), PickResult::Cancelled);
        assert_eq!(
            PickResult::from_option(Some("content://x".to_string())),
            PickResult::Selected("content://x".to_string())
        );
    }

    #[test]
    fn identifier_validity() {
        assert!(is_valid_identifier("content://app/doc/42"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("content://a\0b"));
    }

    #[test]
    fn sentinels_never_classify_as_selection() {
        let config = BridgeConfig::default();
        let cancel = ForwardedValue::NoSelection.to_wire(&config);
        let failed = ForwardedValue::Failed("boom".into()).to_wire(&config);

        assert!(!is_valid_identifier(&cancel));
        assert!(!is_valid_identifier(&failed));
        assert_eq!(ForwardedValue::from_wire(&cancel, &config), ForwardedValue::NoSelection);
        assert_eq!(
            ForwardedValue::from_wire(&failed, &config),
            ForwardedValue::Failed("boom".into())
        );
    }

    #[test]
    fn selection_is_forwarded_verbatim() {
        let config = BridgeConfig::default();
        let value = ForwardedValue::Selected("content://app/doc/42".into());
        assert_eq!(value.to_wire(&config), "content://app/doc/42");
    }

    #[test]
    fn forwarded_value_serializes_with_name_tag() {
        let json = serde_json::to_string(&ForwardedValue::NoSelection).unwrap();
        assert_eq!(json, r#"{"name":"no-selection"}"#);
    }
}
