// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop file picker backed by `rfd`.
//
// Desktop dialogs are synchronous, so the request is started, the dialog is
// shown on the calling thread, and its answer is delivered through the same
// correlator path the mobile callbacks use.

use std::path::PathBuf;

use tracing::info;

use pickbridge_core::error::Result;
use pickbridge_core::{Delivery, PickResult};

use crate::correlator::Correlator;

/// A named extension filter, e.g. `("Documents", &["pdf", "txt"])`.
pub type Filter<'a> = (&'a str, &'a [&'a str]);

/// Options for the desktop dialog.
#[derive(Debug, Default, Clone)]
pub struct PickOptions<'a> {
    pub title: Option<&'a str>,
    pub directory: Option<PathBuf>,
    pub filters: Vec<Filter<'a>>,
}

/// Show an open-file dialog and forward the answer through `correlator`.
///
/// Must be called from the main thread on macOS.
pub fn pick_file(correlator: &Correlator, options: &PickOptions<'_>) -> Result<Delivery> {
    let id = correlator.begin()?;

    let mut dialog = rfd::FileDialog::new();
    if let Some(title) = options.title {
        dialog = dialog.set_title(title);
    }
    if let Some(dir) = &options.directory {
        dialog = dialog.set_directory(dir);
    }
    for (name, extensions) in &options.filters {
        dialog = dialog.add_filter(*name, *extensions);
    }

    info!(request_id = %id, "desktop: opening file dialog");
    let picked: Option<PathBuf> = dialog.pick_file();
    correlator.on_result(id, PickResult::from_option(picked))
}
