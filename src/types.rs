// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power state and relay addressing types.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Represents the power state of a relay.
///
/// # Examples
///
/// ```
/// use tasmota_bridge::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "ON");
/// assert_eq!("off".parse::<PowerState>().unwrap(), PowerState::Off);
/// assert_eq!(PowerState::from(true), PowerState::On);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Power is off.
    Off,
    /// Power is on.
    On,
}

impl PowerState {
    /// Returns the Tasmota command token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns `true` if the state is [`PowerState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = Error;

    /// Parses the tokens Tasmota firmwares emit. Case-insensitive; numeric
    /// forms ("0"/"1") appear on some builds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OFF" | "0" => Ok(Self::Off),
            "ON" | "1" => Ok(Self::On),
            _ => Err(Error::UnexpectedResponse(s.to_string())),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<PowerState> for bool {
    fn from(value: PowerState) -> Self {
        value.is_on()
    }
}

/// Index of the relay channel the accessory controls.
///
/// Index 0 is the bare/default channel: commands address `Power` and replies
/// carry the `POWER` key. Indices 1 through 8 address `Power1`..`Power8` on
/// multi-channel devices. The distinction is exact because the firmware
/// differentiates the unnumbered `POWER` key from `POWER1`, `POWER2`, etc.
///
/// # Examples
///
/// ```
/// use tasmota_bridge::RelayIndex;
///
/// assert_eq!(RelayIndex::bare().command_suffix(), "");
/// assert_eq!(RelayIndex::new(2).unwrap().command_suffix(), "2");
/// assert!(RelayIndex::new(9).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RelayIndex(u8);

impl RelayIndex {
    /// Maximum numbered relay a Tasmota device exposes.
    pub const MAX: u8 = 8;

    /// Creates a relay index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the index is greater than 8.
    pub fn new(index: u8) -> Result<Self, Error> {
        if index > Self::MAX {
            return Err(Error::InvalidConfiguration(format!(
                "relay index {index} is out of range [0, {}]",
                Self::MAX
            )));
        }
        Ok(Self(index))
    }

    /// The bare/default relay (single-channel devices).
    #[must_use]
    pub const fn bare() -> Self {
        Self(0)
    }

    /// Returns the numeric value of the index.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns `true` if this is the unnumbered default relay.
    #[must_use]
    pub const fn is_bare(&self) -> bool {
        self.0 == 0
    }

    /// Returns the command suffix: empty for the bare relay, otherwise the
    /// digits. `Power` + suffix yields exactly `Power`, `Power1`, `Power2`, …
    #[must_use]
    pub fn command_suffix(&self) -> String {
        if self.0 == 0 {
            String::new()
        } else {
            self.0.to_string()
        }
    }

    /// Returns the reply key this relay reports under, e.g. `POWER2`.
    #[must_use]
    pub fn reply_key(&self) -> String {
        format!("POWER{}", self.command_suffix())
    }
}

impl fmt::Display for RelayIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "default")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for RelayIndex {
    type Err = Error;

    /// Parses the host config form: empty string means the bare relay.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::bare());
        }
        let index: u8 = trimmed
            .parse()
            .map_err(|_| Error::InvalidConfiguration(format!("invalid relay index: {s:?}")))?;
        Self::new(index)
    }
}

impl<'de> serde::Deserialize<'de> for RelayIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RelayVisitor;

        impl serde::de::Visitor<'_> for RelayVisitor {
            type Value = RelayIndex;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a relay index as string (\"\", \"1\"..\"8\") or integer (0..8)")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                let index = u8::try_from(v).map_err(E::custom)?;
                RelayIndex::new(index).map_err(E::custom)
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                let index = u8::try_from(v).map_err(E::custom)?;
                RelayIndex::new(index).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(RelayVisitor)
    }
}
