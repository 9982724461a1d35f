// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The switch accessory: cached state, read/write cycles, polling, cleanup.
//!
//! This is the state reconciliation engine the host bridge drives. The cache
//! is set from exactly two sources: a successfully parsed device reply, or an
//! optimistic write. Reads and writes may race across cycles; the last writer
//! wins, which is acceptable because the device is the source of truth and
//! will be re-polled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::command::PowerCommand;
use crate::config::AccessoryConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::subscription::{CallbackRegistry, SubscriptionId};
use crate::transport::HttpClient;
use crate::types::PowerState;

/// A single Tasmota relay exposed to the host bridge as a switch.
///
/// Cheaply cloneable; clones share the cache, subscriptions and poll task.
///
/// # Examples
///
/// ```no_run
/// use tasmota_bridge::{AccessoryConfig, SwitchAccessory};
///
/// # async fn example() -> tasmota_bridge::Result<()> {
/// let accessory = SwitchAccessory::new(AccessoryConfig::new("192.168.1.50"))?;
///
/// accessory.on_state_changed(|on| {
///     println!("switch is now {}", if on { "ON" } else { "OFF" });
/// });
///
/// // Initial read plus periodic polling.
/// accessory.start().await;
///
/// // User flipped the switch in the app.
/// accessory.request_set(true, |err| {
///     if let Some(err) = err {
///         eprintln!("set failed: {err}");
///     }
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SwitchAccessory {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: AccessoryConfig,
    client: HttpClient,
    retry: RetryPolicy,
    /// `None` until the first device reply or optimistic write.
    cached: Mutex<Option<PowerState>>,
    callbacks: CallbackRegistry,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl SwitchAccessory {
    /// Manufacturer reported to the host's accessory information service.
    pub const MANUFACTURER: &'static str = "Tasmota";
    /// Model reported to the host's accessory information service.
    pub const MODEL: &'static str = "HTTP Switch";

    /// Creates an accessory with the default retry policy.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: AccessoryConfig) -> Result<Self> {
        Self::with_retry_policy(config, RetryPolicy::default())
    }

    /// Creates an accessory with a custom retry policy.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn with_retry_policy(config: AccessoryConfig, retry: RetryPolicy) -> Result<Self> {
        let mut client = HttpClient::new(config.hostname())?;
        if let Some(username) = config.username() {
            client = client.with_username(username);
        }
        if let Some(password) = config.password() {
            client = client.with_password(password);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                retry,
                cached: Mutex::new(None),
                callbacks: CallbackRegistry::new(),
                poll_task: Mutex::new(None),
                shut_down: AtomicBool::new(false),
            }),
        })
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.config.name()
    }

    /// Returns the serial the host shows for this accessory: the hostname,
    /// suffixed with `#<relay>` for numbered relays.
    #[must_use]
    pub fn serial(&self) -> String {
        let config = &self.inner.config;
        if config.relay().is_bare() {
            config.hostname().to_string()
        } else {
            format!("{}#{}", config.hostname(), config.relay())
        }
    }

    /// Returns the cached state as the host's boolean. Unknown reads as
    /// `false` until the first device reply proves otherwise.
    #[must_use]
    pub fn cached_on(&self) -> bool {
        self.inner.cached.lock().is_some_and(|s| s.is_on())
    }

    /// Returns the raw cached state; `None` means no reply or write has
    /// touched the cache yet.
    #[must_use]
    pub fn cached_state(&self) -> Option<PowerState> {
        *self.inner.cached.lock()
    }

    /// Registers a state-changed callback; this is the host bridge's
    /// characteristic-update hook.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_state_changed(callback)
    }

    /// Unregisters a state-changed callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.unsubscribe(id)
    }

    /// Logs an identify request from the host.
    pub fn identify(&self) {
        tracing::info!(accessory = self.name(), "identify requested");
    }

    /// Applies a state through the single choke point that decides whether
    /// to notify. Unknown reads as OFF, so the initial assignment notifies
    /// only when the observed state is ON.
    fn apply_state(&self, state: PowerState) {
        let previous = {
            let mut cached = self.inner.cached.lock();
            cached.replace(state)
        };

        let changed = match previous {
            Some(p) => p != state,
            None => state.is_on(),
        };

        if changed {
            tracing::info!(
                accessory = self.name(),
                from = previous.map_or("UNKNOWN", |p| p.as_str()),
                to = state.as_str(),
                "state changed"
            );
            self.inner.callbacks.dispatch(state.is_on());
        }
    }

    /// Runs one read cycle: query the device (with retries) and reconcile
    /// the cache with what it reports.
    ///
    /// Never fails from the caller's perspective: an exhausted retry chain or
    /// an inconclusive reply is logged and the cached state stays valid.
    pub async fn refresh(&self) {
        let relay = self.inner.config.relay();
        let command = PowerCommand::query(relay);
        let inner = &self.inner;

        let result = inner
            .retry
            .run_cancellable(
                || inner.shut_down.load(Ordering::SeqCst),
                || async { inner.client.fetch(&command).await },
            )
            .await;

        match result {
            Ok(reply) => match reply.state_for(relay) {
                Some(state) => self.apply_state(state),
                None => tracing::warn!(
                    accessory = self.name(),
                    ?reply,
                    "reply has no usable POWER key; cache unchanged"
                ),
            },
            Err(err) => tracing::warn!(
                accessory = self.name(),
                error = %err,
                "read cycle failed; keeping cached state"
            ),
        }
    }

    /// Sets the relay and waits for the whole write cycle, including the
    /// follow-up read. The optimistic update still happens first, so
    /// subscribers hear the new state before any network traffic.
    ///
    /// # Errors
    ///
    /// Returns the transport error after retries are exhausted. By then a
    /// corrective read has already run, so the cache reflects whatever the
    /// device actually reports (possibly reverting the optimistic value).
    pub async fn set_power(&self, on: bool) -> Result<()> {
        let desired = PowerState::from(on);
        self.apply_state(desired);
        self.write_cycle(desired).await
    }

    /// Sets the relay without blocking the caller: the optimistic update is
    /// applied and notified immediately, the command goes out in the
    /// background, and the single-fire `on_complete` callback receives the
    /// eventual outcome (`None` on success).
    ///
    /// At most one write is expected in flight; a second `request_set` while
    /// one is pending simply wins the cache.
    pub fn request_set<F>(&self, on: bool, on_complete: F)
    where
        F: FnOnce(Option<Error>) + Send + 'static,
    {
        let desired = PowerState::from(on);
        self.apply_state(desired);

        let accessory = self.clone();
        tokio::spawn(async move {
            let result = accessory.write_cycle(desired).await;
            on_complete(result.err());
        });
    }

    /// Sends the write command and reconciles afterwards. Success and
    /// failure both end in a read cycle: confirmation read-back on success,
    /// corrective read on failure.
    async fn write_cycle(&self, desired: PowerState) -> Result<()> {
        let relay = self.inner.config.relay();
        let command = PowerCommand::set(relay, desired);
        let inner = &self.inner;

        let result = inner
            .retry
            .run_cancellable(
                || inner.shut_down.load(Ordering::SeqCst),
                || async {
                    match inner.client.fetch(&command).await {
                        Ok(reply) => Ok(Some(reply)),
                        // A 2xx body that parses as neither JSON nor a bare
                        // token is an ambiguous acknowledgement, not a
                        // failure worth retrying.
                        Err(Error::UnexpectedResponse(body)) => {
                            tracing::info!(
                                accessory = self.name(),
                                body = %body,
                                "unparsable acknowledgement body"
                            );
                            Ok(None)
                        }
                        Err(err) => Err(err),
                    }
                },
            )
            .await;

        match result {
            Ok(ack) => {
                // Firmware quirk: the acknowledgement may arrive under the
                // bare POWER key even when a numbered relay was addressed.
                // A missing or mismatched acknowledgement on a 2xx reply is
                // logged but still counts as success.
                if ack.and_then(|reply| reply.state_for(relay)) == Some(desired) {
                    tracing::debug!(accessory = self.name(), "write acknowledged");
                } else {
                    tracing::info!(
                        accessory = self.name(),
                        desired = desired.as_str(),
                        "acknowledgement ambiguous; treating as success"
                    );
                }
                self.refresh().await;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    accessory = self.name(),
                    error = %err,
                    "write failed; resyncing with device"
                );
                self.refresh().await;
                Err(err)
            }
        }
    }

    /// Performs the initial read and starts periodic polling. This is what
    /// the host shell calls once when the accessory's services come up.
    pub async fn start(&self) {
        self.refresh().await;
        self.start_polling();
    }

    /// Starts the poll task. Idempotent: a no-op while a task is already
    /// running or after shutdown. The first poll fires one interval after
    /// the start.
    pub fn start_polling(&self) {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return;
        }

        let mut task = self.inner.poll_task.lock();
        if task.is_some() {
            return;
        }

        let every = self.inner.config.poll_interval();
        tracing::info!(
            accessory = self.name(),
            seconds = every.as_secs(),
            "starting poll cycle"
        );

        let accessory = self.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial read is the
            // caller's job, so skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                accessory.refresh().await;
            }
        }));
    }

    /// Stops the poll task. Safe to call repeatedly. In-flight retries are
    /// not interrupted; they finish or exhaust without re-arming the timer.
    pub fn stop_polling(&self) {
        if let Some(task) = self.inner.poll_task.lock().take() {
            task.abort();
            tracing::info!(accessory = self.name(), "stopped polling");
        }
    }

    /// Returns `true` while the poll task is armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.poll_task.lock().is_some()
    }

    /// Tears the accessory down exactly once: stops polling and lets any
    /// pending retry chain end early instead of arming another delay.
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_polling();
        tracing::info!(accessory = self.name(), "shut down");
    }

    /// Waits for Ctrl-C (or SIGTERM on unix), then shuts the accessory
    /// down.
    pub async fn run_until_shutdown(&self) {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {
                tracing::info!("received Ctrl+C, shutting down");
            }
            () = terminate => {
                tracing::info!("received SIGTERM, shutting down");
            }
        }

        self.shutdown();
    }
}
