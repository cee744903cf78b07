// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary forwarder: marshals a picker outcome into its wire string and calls
// the native sink synchronously on the delivering thread.
//
// Every outcome reaches the sink, including cancellation and marshalling
// failure, so the native side is never left waiting on a request that has
// already ended.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use pickbridge_core::error::{BridgeError, Result};
use pickbridge_core::{BridgeConfig, ForwardedValue, PickResult, RequestId, is_valid_identifier};

use crate::traits::{NativeSink, PlatformUri};

/// Holds a non-owning handle to the sink plus the wire sentinels.
#[derive(Clone)]
pub struct Forwarder {
    sink: Weak<dyn NativeSink>,
    config: Arc<BridgeConfig>,
}

impl Forwarder {
    pub fn new(sink: &Arc<dyn NativeSink>, config: Arc<BridgeConfig>) -> Self {
        Self {
            sink: Arc::downgrade(sink),
            config,
        }
    }

    /// Whether the sink is still alive.
    pub fn is_connected(&self) -> bool {
        self.sink.strong_count() > 0
    }

    /// Marshal `result` and hand it to the sink.
    ///
    /// On marshalling failure the failure sentinel is still delivered and
    /// `BridgeError::Marshal` is returned. A sink that cannot be reached
    /// yields `BridgeError::BridgeUnavailable`.
    pub fn forward<U: PlatformUri>(
        &self,
        request_id: RequestId,
        result: PickResult<U>,
    ) -> Result<ForwardedValue> {
        let (value, marshal_error) = match result {
            PickResult::Selected(uri) => match marshal(uri) {
                Ok(id) => (ForwardedValue::Selected(id), None),
                Err(reason) => (
                    ForwardedValue::Failed(reason.clone()),
                    Some(BridgeError::Marshal(reason)),
                ),
            },
            PickResult::Cancelled => (ForwardedValue::NoSelection, None),
        };

        let sent = self.notify(request_id, &value);

        match (marshal_error, sent) {
            (None, Ok(())) => Ok(value),
            (None, Err(e)) => Err(e),
            (Some(e), Ok(())) => Err(e),
            (Some(e), Err(sink_err)) => {
                warn!(
                    request_id = %request_id,
                    error = %sink_err,
                    "failure sentinel could not be delivered"
                );
                Err(e)
            }
        }
    }

    /// Deliver an already-canonical value.
    fn notify(&self, request_id: RequestId, value: &ForwardedValue) -> Result<()> {
        let sink = self.sink.upgrade().ok_or_else(|| {
            BridgeError::BridgeUnavailable("native sink has been dropped".into())
        })?;

        let wire = value.to_wire(&self.config);
        debug!(request_id = %request_id, kind = kind(value), "calling native sink");

        // A panicking sink must not unwind into the platform's callback thread.
        match catch_unwind(AssertUnwindSafe(|| sink.save_dialog_uri(&wire))) {
            Ok(result) => result,
            Err(_) => Err(BridgeError::BridgeUnavailable(
                "native sink panicked".into(),
            )),
        }
    }
}

/// Canonical string form of a platform identifier, or the reason it has none.
fn marshal<U: PlatformUri>(uri: U) -> std::result::Result<String, String> {
    let id = uri.into_uri_string().map_err(|e| match e {
        BridgeError::Marshal(reason) => reason,
        other => other.to_string(),
    })?;
    if id.is_empty() {
        return Err("platform returned an empty identifier".into());
    }
    if !is_valid_identifier(&id) {
        return Err("identifier contains NUL".into());
    }
    Ok(id)
}

fn kind(value: &ForwardedValue) -> &'static str {
    match value {
        ForwardedValue::Selected(_) => "selected",
        ForwardedValue::NoSelection => "no-selection",
        ForwardedValue::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::sinks::FnSink;

    struct Broken;

    impl PlatformUri for Broken {
        fn into_uri_string(self) -> Result<String> {
            Err(BridgeError::Marshal("Uri.toString threw".into()))
        }
    }

    fn recording_sink() -> (Arc<dyn NativeSink>, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let sink: Arc<dyn NativeSink> = Arc::new(FnSink(move |uri: &str| -> Result<()> {
            seen.lock().unwrap().push(uri.to_owned());
            Ok(())
        }));
        (sink, calls)
    }

    fn forwarder(sink: &Arc<dyn NativeSink>) -> Forwarder {
        Forwarder::new(sink, Arc::new(BridgeConfig::default()))
    }

    #[test]
    fn selection_round_trips_exactly() {
        let (sink, calls) = recording_sink();
        let value = forwarder(&sink)
            .forward(RequestId::new(), PickResult::Selected("content://app/doc/42"))
            .unwrap();
        assert_eq!(value, ForwardedValue::Selected("content://app/doc/42".into()));
        assert_eq!(*calls.lock().unwrap(), vec!["content://app/doc/42".to_string()]);
    }

    #[test]
    fn cancellation_forwards_sentinel() {
        let (sink, calls) = recording_sink();
        let value = forwarder(&sink)
            .forward::<String>(RequestId::new(), PickResult::Cancelled)
            .unwrap();
        assert_eq!(value, ForwardedValue::NoSelection);
        assert_eq!(*calls.lock().unwrap(), vec![String::new()]);
    }

    #[test]
    fn marshal_failure_still_notifies_sink() {
        let (sink, calls) = recording_sink();
        let err = forwarder(&sink)
            .forward(RequestId::new(), PickResult::Selected(Broken))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Marshal(_)));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], "\0error:Uri.toString threw");
    }

    #[test]
    fn empty_identifier_is_a_marshal_failure() {
        let (sink, calls) = recording_sink();
        let err = forwarder(&sink)
            .forward(RequestId::new(), PickResult::Selected(""))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Marshal(_)));
        assert!(calls.lock().unwrap()[0].starts_with('\0'));
    }

    #[test]
    fn dropped_sink_is_unavailable() {
        let (sink, _calls) = recording_sink();
        let fwd = forwarder(&sink);
        drop(sink);
        assert!(!fwd.is_connected());
        let err = fwd
            .forward(RequestId::new(), PickResult::Selected("content://x"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::BridgeUnavailable(_)));
    }

    #[test]
    fn panicking_sink_is_contained() {
        let sink: Arc<dyn NativeSink> =
            Arc::new(FnSink(|_: &str| -> Result<()> { panic!("native layer crashed") }));
        let err = forwarder(&sink)
            .forward(RequestId::new(), PickResult::Selected("content://x"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::BridgeUnavailable(_)));
    }
}
