use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct CallTrackerEntry {
    source: CancellationToken,
    refcount: usize,
}

/// Cancellation sources of the in-flight calls of one method, keyed by call
/// id and reference counted.
///
/// The dispatching request and a cancellation request for the same call each
/// take a reference; whichever finishes last removes the entry.
#[derive(Default)]
pub struct MethodCallTracker {
    calls: DashMap<String, CallTrackerEntry>,
}

impl MethodCallTracker {
    pub fn get_or_add_cancellation_token_source(&self, call_id: &str) -> CancellationToken {
        let mut entry = self
            .calls
            .entry(call_id.to_string())
            .or_insert_with(|| CallTrackerEntry {
                source: CancellationToken::new(),
                refcount: 0,
            });
        entry.refcount += 1;
        entry.source.clone()
    }

    /// Drops one reference; returns `true` when that removed the entry.
    pub fn try_remove_cancellation_token_source(&self, call_id: &str) -> bool {
        match self.calls.entry(call_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let tracked = entry.get_mut();
                tracked.refcount = tracked.refcount.saturating_sub(1);
                if tracked.refcount == 0 {
                    entry.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn refcount(&self, call_id: &str) -> usize {
        self.calls
            .get(call_id)
            .map(|entry| entry.refcount)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Server-side registry of cancellable calls, one [`MethodCallTracker`] per
/// `(interfaceId, methodId)`.
#[derive(Default)]
pub struct CancellationTracker {
    methods: DashMap<(i32, i32), Arc<MethodCallTracker>>,
}

impl CancellationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method_tracker(&self, interface_id: i32, method_id: i32) -> Arc<MethodCallTracker> {
        self.methods
            .entry((interface_id, method_id))
            .or_default()
            .value()
            .clone()
    }

    /// Attaches a dispatch to the cancellation source of `call_id`. The
    /// returned guard detaches on drop.
    pub fn track(&self, interface_id: i32, method_id: i32, call_id: &str) -> TrackedCall {
        let tracker = self.method_tracker(interface_id, method_id);
        let token = tracker.get_or_add_cancellation_token_source(call_id);
        TrackedCall {
            tracker,
            call_id: call_id.to_string(),
            token,
        }
    }

    /// Signals the cancellation source of `call_id`.
    ///
    /// Only a dispatch already tracked observes the signal. A cancel that
    /// arrives before its call is dispatched is dropped, and the call later
    /// runs to completion.
    pub fn cancel(&self, interface_id: i32, method_id: i32, call_id: &str) {
        let tracker = self.method_tracker(interface_id, method_id);
        tracker
            .get_or_add_cancellation_token_source(call_id)
            .cancel();
        tracker.try_remove_cancellation_token_source(call_id);
        tracing::debug!(
            "Canceled call {} of method {} on interface {}",
            call_id,
            method_id,
            interface_id
        );
    }

    /// Number of calls currently holding a cancellation source.
    pub fn in_flight_calls(&self) -> usize {
        self.methods.iter().map(|tracker| tracker.len()).sum()
    }
}

/// A dispatch registered with the [`CancellationTracker`].
pub struct TrackedCall {
    tracker: Arc<MethodCallTracker>,
    call_id: String,
    token: CancellationToken,
}

impl TrackedCall {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for TrackedCall {
    fn drop(&mut self) {
        self.tracker
            .try_remove_cancellation_token_source(&self.call_id);
    }
}
