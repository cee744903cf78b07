// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pickbridge-probe: manual check of the bridge on a desktop.
//
// Opens the native file dialog, forwards the answer through a channel sink and
// prints the value the native side received as JSON.
//
// Usage: pickbridge-probe [config.json]

use std::process::ExitCode;
use std::sync::Arc;

use pickbridge_bridge::desktop::{PickOptions, pick_file};
use pickbridge_bridge::{Correlator, NativeSink, channel};
use pickbridge_core::BridgeConfig;
use pickbridge_core::error::Result;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("probe failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    let (sink, mut receiver) = channel(&config);
    let sink: Arc<dyn NativeSink> = Arc::new(sink);
    let correlator = Correlator::new(&sink, config)?;

    let options = PickOptions {
        title: Some("Choose a file to forward"),
        ..Default::default()
    };
    let delivery = pick_file(&correlator, &options);

    // The sink is called synchronously, so whatever it received is queued.
    if let Some(value) = receiver.try_recv() {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    delivery.map(|d| tracing::info!(?d, "probe finished"))
}
