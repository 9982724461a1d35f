// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State-change subscriptions.
//!
//! The host bridge registers a callback here and receives the new boolean
//! state whenever the reconciliation engine detects an actual transition.
//! Dispatch is the engine's responsibility; the registry guarantees at most
//! one invocation per dispatched transition per subscriber.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Unique identifier for a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type StateCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry for state-changed callbacks.
///
/// Thread-safe; callbacks are invoked synchronously in arbitrary order.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    state_callbacks: RwLock<HashMap<SubscriptionId, StateCallback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a callback invoked with the new state on every transition.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.state_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback. Returns `true` if one was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state_callbacks.write().remove(&id).is_some()
    }

    /// Removes all callbacks.
    pub fn clear(&self) {
        self.state_callbacks.write().clear();
    }

    /// Dispatches a transition to every subscriber.
    pub fn dispatch(&self, on: bool) {
        let callbacks = self.state_callbacks.read();
        for callback in callbacks.values() {
            callback(on);
        }
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
