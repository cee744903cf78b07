// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result correlator.
//
// Binds each outstanding pick request to exactly one forwarded outcome. The
// platform may redeliver (process restart, duplicate callback) or deliver from
// several threads at once; lookup and mark-complete happen under a single
// mutex so only one delivery per request ever reaches the forwarder.
//
// The sink is called after the lock is released, so a sink may start a new
// pick request from inside its callback.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use pickbridge_core::error::{BridgeError, Result};
use pickbridge_core::{BridgeConfig, Delivery, IgnoreReason, PickRequest, PickResult, RequestId};

use crate::forwarder::Forwarder;
use crate::traits::{NativeSink, PlatformUri};

/// Request bookkeeping guarded by the correlator mutex.
#[derive(Default)]
struct Registry {
    pending: HashMap<RequestId, PickRequest>,
    /// Recently completed ids, oldest first, for redelivery detection.
    history: VecDeque<RequestId>,
    completed: HashSet<RequestId>,
}

impl Registry {
    /// Atomically take a pending request out of the map and mark it complete.
    fn claim(
        &mut self,
        id: RequestId,
        history_limit: usize,
    ) -> std::result::Result<PickRequest, IgnoreReason> {
        let Some(mut request) = self.pending.remove(&id) else {
            return Err(if self.completed.contains(&id) {
                IgnoreReason::DuplicateDelivery
            } else {
                IgnoreReason::UnknownRequest
            });
        };

        // Only pending requests live in the map, so this always flips.
        request.complete();
        self.remember(id, history_limit);
        Ok(request)
    }

    fn remember(&mut self, id: RequestId, history_limit: usize) {
        if history_limit == 0 {
            return;
        }
        while self.history.len() >= history_limit {
            if let Some(oldest) = self.history.pop_front() {
                self.completed.remove(&oldest);
            }
        }
        self.history.push_back(id);
        self.completed.insert(id);
    }
}

/// Matches picker results to their requests and enforces single delivery.
///
/// Cheaply cloneable; clones share the same registry and sink handle.
#[derive(Clone)]
pub struct Correlator {
    registry: Arc<Mutex<Registry>>,
    forwarder: Forwarder,
    config: Arc<BridgeConfig>,
}

impl Correlator {
    /// Create a correlator forwarding into `sink`.
    ///
    /// Only a weak handle to the sink is kept; dropping the last `Arc` tears
    /// the bridge down and later deliveries fail with `BridgeUnavailable`.
    pub fn new(sink: &Arc<dyn NativeSink>, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            forwarder: Forwarder::new(sink, Arc::clone(&config)),
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// A panic elsewhere while holding the lock leaves the maps consistent
    /// (every mutation is a single insert/remove), so keep going.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new outstanding pick request. Call right before launching
    /// the platform picker.
    pub fn begin(&self) -> Result<RequestId> {
        let request = PickRequest::new();
        let id = request.id;

        let mut registry = self.registry();
        let limit = self.config.max_outstanding;
        if limit > 0 && registry.pending.len() >= limit {
            warn!(limit, "refusing new pick request, too many outstanding");
            return Err(BridgeError::TooManyOutstanding { limit });
        }
        registry.pending.insert(id, request);
        drop(registry);

        info!(request_id = %id, "pick request started");
        Ok(id)
    }

    /// Deliver the platform's outcome for `id`.
    ///
    /// Unknown or already-completed requests are a silent no-op returning
    /// `Delivery::Ignored`. Otherwise the outcome is forwarded exactly once;
    /// marshalling and sink failures are returned and end the request.
    #[instrument(skip_all, fields(request_id = %id))]
    pub fn on_result<U: PlatformUri>(
        &self,
        id: RequestId,
        result: PickResult<U>,
    ) -> Result<Delivery> {
        let request = match self.registry().claim(id, self.config.completed_history) {
            Ok(request) => request,
            Err(reason) => {
                debug!(?reason, "ignoring stale picker result");
                return Ok(Delivery::Ignored(reason));
            }
        };
        self.finish(request, result)
    }

    /// Abandon `id` (owning UI destroyed). The native side is told there is no
    /// selection and any later platform result is ignored.
    #[instrument(skip_all, fields(request_id = %id))]
    pub fn invalidate(&self, id: RequestId) -> Result<Delivery> {
        let request = match self.registry().claim(id, self.config.completed_history) {
            Ok(request) => request,
            Err(reason) => {
                debug!(?reason, "nothing to invalidate");
                return Ok(Delivery::Ignored(reason));
            }
        };
        info!("pick request invalidated");
        self.finish::<String>(request, PickResult::Cancelled)
    }

    /// Invalidate every outstanding request, e.g. on bridge teardown.
    ///
    /// Returns the per-request outcome so the owner can report failures.
    pub fn drain(&self) -> Vec<(RequestId, Result<Delivery>)> {
        let ids: Vec<RequestId> = self.registry().pending.keys().copied().collect();
        if !ids.is_empty() {
            info!(count = ids.len(), "draining outstanding pick requests");
        }
        ids.into_iter()
            .map(|id| (id, self.invalidate(id)))
            .collect()
    }

    /// Number of requests still waiting for a platform result.
    pub fn pending(&self) -> usize {
        self.registry().pending.len()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.registry().pending.contains_key(&id)
    }

    /// Whether the native sink is still reachable.
    pub fn is_connected(&self) -> bool {
        self.forwarder.is_connected()
    }

    fn finish<U: PlatformUri>(
        &self,
        request: PickRequest,
        result: PickResult<U>,
    ) -> Result<Delivery> {
        let waited_ms = (Utc::now() - request.started_at).num_milliseconds();
        match self.forwarder.forward(request.id, result) {
            Ok(value) => {
                info!(waited_ms, selected = value.is_selection(), "pick result forwarded");
                Ok(Delivery::Forwarded(value))
            }
            Err(e) => {
                warn!(waited_ms, error = %e, "pick request failed");
                Err(e)
            }
        }
    }
}
