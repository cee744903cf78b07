// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait seams on either side of the bridge.
//
// `PlatformUri` is what the picker hands us; `NativeSink` is the single entry
// point on the native side that receives the forwarded string.

use std::path::PathBuf;

use pickbridge_core::error::{BridgeError, Result};

/// The native entry point that consumes a forwarded identifier.
///
/// The bridge never owns a sink; it keeps a `Weak` handle and reports
/// `BridgeError::BridgeUnavailable` once the owner has dropped it.
/// Implementations are called synchronously on whichever thread delivered the
/// picker result.
pub trait NativeSink: Send + Sync {
    /// Receive the canonical wire string for one finished pick request.
    ///
    /// Called at most once per request. Returning `BridgeUnavailable` marks
    /// the request failed; it is not retried.
    fn save_dialog_uri(&self, uri: &str) -> Result<()>;
}

/// A platform object that refers to a picked resource.
///
/// Conversion is consuming because some platforms (JNI) need exclusive access
/// to their environment while marshalling.
pub trait PlatformUri {
    /// Produce the canonical string form of the identifier.
    ///
    /// Failures must be reported as `BridgeError::Marshal`.
    fn into_uri_string(self) -> Result<String>;
}

impl PlatformUri for String {
    fn into_uri_string(self) -> Result<String> {
        Ok(self)
    }
}

impl PlatformUri for &str {
    fn into_uri_string(self) -> Result<String> {
        Ok(self.to_owned())
    }
}

/// Desktop pickers hand back paths; the canonical form is the UTF-8 path.
impl PlatformUri for PathBuf {
    fn into_uri_string(self) -> Result<String> {
        self.into_os_string()
            .into_string()
            .map_err(|raw| BridgeError::Marshal(format!("path is not valid UTF-8: {raw:?}")))
    }
}
