// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ready-made `NativeSink` implementations.
//
// - `FnSink`      wraps a closure (tests, in-process consumers).
// - `ChannelSink` pushes wire strings into a tokio channel so an async task on
//                 the native side can await the outcome.
// - `ExternSink`  calls a C function pointer with a pointer/length pair.

use std::ffi::c_char;

use tokio::sync::mpsc;
use tracing::debug;

use pickbridge_core::error::{BridgeError, Result};
use pickbridge_core::{BridgeConfig, ForwardedValue};

use crate::traits::NativeSink;

// ---------------------------------------------------------------------------
// Closure sink
// ---------------------------------------------------------------------------

/// Adapts any `Fn(&str) -> Result<()>` into a sink.
pub struct FnSink<F>(pub F);

impl<F> NativeSink for FnSink<F>
where
    F: Fn(&str) -> Result<()> + Send + Sync,
{
    fn save_dialog_uri(&self, uri: &str) -> Result<()> {
        (self.0)(uri)
    }
}

// ---------------------------------------------------------------------------
// Channel sink
// ---------------------------------------------------------------------------

/// Create a connected sink/receiver pair.
///
/// The receiver classifies wire strings back into `ForwardedValue`s using the
/// same sentinels the forwarder was configured with.
pub fn channel(config: &BridgeConfig) -> (ChannelSink, SinkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelSink { tx },
        SinkReceiver {
            rx,
            config: config.clone(),
        },
    )
}

/// Sink half of [`channel`]. Sending never blocks the delivering thread.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl NativeSink for ChannelSink {
    fn save_dialog_uri(&self, uri: &str) -> Result<()> {
        self.tx
            .send(uri.to_owned())
            .map_err(|_| BridgeError::BridgeUnavailable("sink receiver dropped".into()))
    }
}

/// Native-side half of [`channel`].
pub struct SinkReceiver {
    rx: mpsc::UnboundedReceiver<String>,
    config: BridgeConfig,
}

impl SinkReceiver {
    /// Wait for the next forwarded value. `None` once every sink is gone.
    pub async fn recv(&mut self) -> Option<ForwardedValue> {
        let wire = self.rx.recv().await?;
        debug!(len = wire.len(), "sink receiver got wire value");
        Some(ForwardedValue::from_wire(&wire, &self.config))
    }

    /// Non-blocking poll.
    pub fn try_recv(&mut self) -> Option<ForwardedValue> {
        self.rx
            .try_recv()
            .ok()
            .map(|wire| ForwardedValue::from_wire(&wire, &self.config))
    }

    /// Blocking receive for callers outside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<ForwardedValue> {
        self.rx
            .blocking_recv()
            .map(|wire| ForwardedValue::from_wire(&wire, &self.config))
    }
}

// ---------------------------------------------------------------------------
// C function pointer sink
// ---------------------------------------------------------------------------

/// Signature of a C entry point receiving the wire string.
///
/// `uri` points at `len` bytes of UTF-8 that are only valid for the duration
/// of the call. The bytes are not NUL-terminated and may contain NUL (the
/// failure sentinel starts with one).
pub type SaveDialogUriFn = unsafe extern "C" fn(uri: *const c_char, len: usize);

/// Forwards into a foreign function.
pub struct ExternSink {
    callback: SaveDialogUriFn,
}

impl ExternSink {
    /// # Safety
    ///
    /// `callback` must stay callable for as long as this sink is alive, must
    /// be safe to call from any thread, and must not retain `uri` past the
    /// call.
    pub unsafe fn new(callback: SaveDialogUriFn) -> Self {
        Self { callback }
    }
}

impl NativeSink for ExternSink {
    fn save_dialog_uri(&self, uri: &str) -> Result<()> {
        // SAFETY: upheld by the contract of `ExternSink::new`; the pointer and
        // length describe `uri`, which outlives the call.
        unsafe { (self.callback)(uri.as_ptr().cast(), uri.len()) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[tokio::test]
    async fn channel_classifies_wire_values() {
        let config = BridgeConfig::default();
        let (sink, mut rx) = channel(&config);

        sink.save_dialog_uri("content://x").unwrap();
        sink.save_dialog_uri(&ForwardedValue::NoSelection.to_wire(&config))
            .unwrap();

        assert_eq!(rx.recv().await, Some(ForwardedValue::Selected("content://x".into())));
        assert_eq!(rx.recv().await, Some(ForwardedValue::NoSelection));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn blocking_recv_outside_runtime() {
        let config = BridgeConfig::default();
        let (sink, mut rx) = channel(&config);

        let producer = std::thread::spawn(move || {
            sink.save_dialog_uri("content://app/doc/42").unwrap();
            sink.save_dialog_uri("\0error:bad uri").unwrap();
        });

        assert_eq!(
            rx.blocking_recv(),
            Some(ForwardedValue::Selected("content://app/doc/42".into()))
        );
        assert_eq!(rx.blocking_recv(), Some(ForwardedValue::Failed("bad uri".into())));
        producer.join().unwrap();
        // Sink dropped with the producer thread.
        assert_eq!(rx.blocking_recv(), None);
    }

    #[test]
    fn closed_channel_is_bridge_unavailable() {
        let (sink, rx) = channel(&BridgeConfig::default());
        drop(rx);
        let err = sink.save_dialog_uri("content://x").unwrap_err();
        assert!(matches!(err, BridgeError::BridgeUnavailable(_)));
    }

    static RECEIVED: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

    unsafe extern "C" fn record(uri: *const c_char, len: usize) {
        // SAFETY: the sink hands us a live pointer/length pair.
        let bytes = unsafe { std::slice::from_raw_parts(uri.cast::<u8>(), len) };
        RECEIVED.lock().unwrap().push(bytes.to_vec());
    }

    #[test]
    fn extern_sink_passes_bytes_including_nul() {
        // SAFETY: `record` is a plain function that copies its input.
        let sink = unsafe { ExternSink::new(record) };
        sink.save_dialog_uri("\0error:bad").unwrap();
        let received = RECEIVED.lock().unwrap();
        assert_eq!(received.last().unwrap().as_slice(), b"\0error:bad");
    }
}
