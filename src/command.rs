// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tasmota command encoding.
//!
//! A command consists of a name with an optional relay suffix (`Power`,
//! `Power1`, …) and an optional payload (`ON`, `OFF`). The full HTTP form is
//! `<name> <payload>` or just `<name>` for queries.

use crate::types::{PowerState, RelayIndex};

/// A command that can be sent to the device.
pub trait Command {
    /// Returns the command name with any relay suffix.
    fn name(&self) -> String;

    /// Returns the command payload, if any. Queries have none.
    fn payload(&self) -> Option<String>;

    /// Returns the full command string for the `cmnd` query parameter.
    fn to_http_command(&self) -> String {
        match self.payload() {
            Some(p) => format!("{} {}", self.name(), p),
            None => self.name(),
        }
    }
}

/// Command to read or set the power state of a relay.
///
/// # Examples
///
/// ```
/// use tasmota_bridge::{Command, PowerCommand, PowerState, RelayIndex};
///
/// let read = PowerCommand::query(RelayIndex::bare());
/// assert_eq!(read.to_http_command(), "Power");
///
/// let write = PowerCommand::set(RelayIndex::new(1).unwrap(), PowerState::On);
/// assert_eq!(write.to_http_command(), "Power1 ON");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// Query the current power state.
    Get {
        /// The relay to query.
        relay: RelayIndex,
    },
    /// Set the power state.
    Set {
        /// The relay to control.
        relay: RelayIndex,
        /// The desired power state.
        state: PowerState,
    },
}

impl PowerCommand {
    /// Creates a read command for the given relay.
    #[must_use]
    pub const fn query(relay: RelayIndex) -> Self {
        Self::Get { relay }
    }

    /// Creates a write command for the given relay.
    #[must_use]
    pub const fn set(relay: RelayIndex, state: PowerState) -> Self {
        Self::Set { relay, state }
    }

    /// Creates a command to turn the relay on.
    #[must_use]
    pub const fn on(relay: RelayIndex) -> Self {
        Self::set(relay, PowerState::On)
    }

    /// Creates a command to turn the relay off.
    #[must_use]
    pub const fn off(relay: RelayIndex) -> Self {
        Self::set(relay, PowerState::Off)
    }

    /// Returns the relay this command addresses.
    #[must_use]
    pub const fn relay(&self) -> RelayIndex {
        match self {
            Self::Get { relay } | Self::Set { relay, .. } => *relay,
        }
    }
}

impl Command for PowerCommand {
    fn name(&self) -> String {
        format!("Power{}", self.relay().command_suffix())
    }

    fn payload(&self) -> Option<String> {
        match self {
            Self::Get { .. } => None,
            Self::Set { state, .. } => Some(state.as_str().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_command_all_relay_forms() {
        assert_eq!(PowerCommand::query(RelayIndex::bare()).name(), "Power");
        assert_eq!(
            PowerCommand::query(RelayIndex::new(1).unwrap()).name(),
            "Power1"
        );
        assert_eq!(
            PowerCommand::query(RelayIndex::new(2).unwrap()).name(),
            "Power2"
        );
    }

    #[test]
    fn read_command_has_no_payload() {
        let cmd = PowerCommand::query(RelayIndex::bare());
        assert_eq!(cmd.payload(), None);
        assert_eq!(cmd.to_http_command(), "Power");
    }

    #[test]
    fn write_command_appends_token() {
        let on = PowerCommand::on(RelayIndex::bare());
        assert_eq!(on.to_http_command(), "Power ON");

        let off = PowerCommand::off(RelayIndex::new(2).unwrap());
        assert_eq!(off.to_http_command(), "Power2 OFF");
    }

    #[test]
    fn bare_relay_produces_exact_bare_name() {
        let cmd = PowerCommand::on(RelayIndex::bare());
        assert_eq!(cmd.name(), "Power");
        assert_eq!(cmd.to_http_command(), "Power ON");
    }
}
