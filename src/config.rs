// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory configuration.
//!
//! The host platform hands the accessory a JSON config block; this module
//! deserializes it leniently the way the original plugin coerced its values:
//! `user` is accepted as an alias for `username`, `relay` may be a string or
//! an integer, and a `pollInterval` that is missing, non-numeric, or below
//! the safety floor falls back to the default.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;
use crate::types::RelayIndex;

/// Default poll interval in seconds.
pub const DEFAULT_POLL_SECONDS: u64 = 60;
/// Safety floor for the poll interval; configured values below this fall
/// back to [`DEFAULT_POLL_SECONDS`].
pub const MIN_POLL_SECONDS: u64 = 5;

fn default_name() -> String {
    "Tasmota Switch".to_string()
}

fn default_hostname() -> String {
    "sonoff".to_string()
}

fn default_poll_seconds() -> u64 {
    DEFAULT_POLL_SECONDS
}

/// Lenient poll interval parsing: numbers pass through, numeric strings are
/// parsed, anything else becomes the default.
fn lenient_poll_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(DEFAULT_POLL_SECONDS),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(DEFAULT_POLL_SECONDS),
        _ => DEFAULT_POLL_SECONDS,
    })
}

/// Configuration for one switch accessory. Immutable after construction.
///
/// # Examples
///
/// ```
/// use tasmota_bridge::{AccessoryConfig, RelayIndex};
///
/// let config = AccessoryConfig::new("192.168.1.50")
///     .with_name("Garage Light")
///     .with_relay(RelayIndex::new(2).unwrap())
///     .with_credentials("admin", "secret")
///     .with_poll_seconds(30);
///
/// assert_eq!(config.hostname(), "192.168.1.50");
/// assert_eq!(config.poll_interval().as_secs(), 30);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AccessoryConfig {
    /// Display label for the accessory.
    #[serde(default = "default_name")]
    name: String,
    /// Device network address (host or IP).
    #[serde(default = "default_hostname")]
    hostname: String,
    /// Relay channel to control.
    #[serde(default)]
    relay: RelayIndex,
    /// Optional username for the Tasmota web interface.
    #[serde(default, alias = "user")]
    username: Option<String>,
    /// Optional password for the Tasmota web interface.
    #[serde(default)]
    password: Option<String>,
    /// Poll interval in seconds, before floor validation.
    #[serde(
        rename = "pollInterval",
        default = "default_poll_seconds",
        deserialize_with = "lenient_poll_seconds"
    )]
    poll_seconds: u64,
}

impl AccessoryConfig {
    /// Creates a configuration for the given device hostname with defaults
    /// for everything else.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            hostname: hostname.into(),
            relay: RelayIndex::bare(),
            username: None,
            password: None,
            poll_seconds: DEFAULT_POLL_SECONDS,
        }
    }

    /// Parses a configuration from the host's JSON config block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the JSON is malformed or a
    /// field has an unusable value (e.g. a relay index above 8).
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the relay channel.
    #[must_use]
    pub fn with_relay(mut self, relay: RelayIndex) -> Self {
        self.relay = relay;
        self
    }

    /// Sets both credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the poll interval in seconds. Values below the floor fall back
    /// to the default when read through [`AccessoryConfig::poll_interval`].
    #[must_use]
    pub fn with_poll_seconds(mut self, seconds: u64) -> Self {
        self.poll_seconds = seconds;
        self
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the device hostname.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the relay channel.
    #[must_use]
    pub fn relay(&self) -> RelayIndex {
        self.relay
    }

    /// Returns the username if set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the password if set.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the effective poll interval.
    ///
    /// Values below [`MIN_POLL_SECONDS`] fall back to the default interval,
    /// not the floor.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        let seconds = if self.poll_seconds < MIN_POLL_SECONDS {
            DEFAULT_POLL_SECONDS
        } else {
            self.poll_seconds
        };
        Duration::from_secs(seconds)
    }
}
