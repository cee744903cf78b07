// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for pickbridge.

use thiserror::Error;

/// Top-level error type for all bridge operations.
///
/// Every variant is terminal for the single pick request it concerns. None of
/// them is retried by the bridge and none should bring the host down.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Forwarding --
    /// The selected resource could not be turned into its canonical string.
    /// The native layer has already been told about the failure.
    #[error("identifier could not be marshalled: {0}")]
    Marshal(String),

    /// The native entry point could not be reached (sink dropped, channel
    /// closed, library torn down).
    #[error("native entry point unavailable: {0}")]
    BridgeUnavailable(String),

    // -- Correlation --
    #[error("too many outstanding pick requests (limit {limit})")]
    TooManyOutstanding { limit: usize },

    #[error("invalid request identifier: {0}")]
    InvalidRequestId(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
