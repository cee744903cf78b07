// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pickbridge: exactly-once delivery of picker results into native code.
//
// A platform file/URI picker answers asynchronously on its own thread. The
// `Correlator` ties that answer to the request that launched the picker and
// guarantees a single delivery; the `Forwarder` marshals it into a string and
// calls the `NativeSink` synchronously. Every request that ends (selected,
// cancelled, failed, abandoned) reaches the sink exactly once.

pub mod correlator;
pub mod forwarder;
pub mod sinks;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(feature = "desktop-picker")]
pub mod desktop;

pub use correlator::Correlator;
pub use forwarder::Forwarder;
pub use sinks::{ChannelSink, ExternSink, FnSink, SinkReceiver, channel};
pub use traits::{NativeSink, PlatformUri};
