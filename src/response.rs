// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power reply parsing.

use crate::error::Error;
use crate::types::{PowerState, RelayIndex};

/// Reply to a Power command.
///
/// Tasmota answers in JSON, `{"POWER": "ON"}` for single-relay devices or
/// `{"POWER2": "OFF"}` when a numbered relay was addressed. Some firmwares
/// answer a write on a numbered relay under the bare `POWER` key anyway, and
/// a few return the bare token `ON`/`OFF` as plain text instead of JSON; both
/// quirks are handled here.
///
/// # Examples
///
/// ```
/// use tasmota_bridge::{PowerReply, PowerState, RelayIndex};
///
/// let reply = PowerReply::from_body(r#"{"POWER1": "ON"}"#).unwrap();
/// let relay = RelayIndex::new(1).unwrap();
/// assert_eq!(reply.state_for(relay), Some(PowerState::On));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PowerReply {
    power: Option<String>,
    power1: Option<String>,
    power2: Option<String>,
    power3: Option<String>,
    power4: Option<String>,
    power5: Option<String>,
    power6: Option<String>,
    power7: Option<String>,
    power8: Option<String>,
}

impl PowerReply {
    /// Parses a response body.
    ///
    /// The body is first interpreted as a JSON object. Non-string values
    /// under the POWER keys are coerced to their text form, so a numeric
    /// `0`/`1` reply parses too. If the body is not JSON, a trimmed
    /// plain-text body of exactly `ON` or `OFF` (case-insensitive) is
    /// accepted under the bare key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedResponse`] if the body is neither.
    pub fn from_body(body: &str) -> Result<Self, Error> {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
            let token = |key: &str| {
                map.get(key).map(|value| match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            };
            return Ok(Self {
                power: token("POWER"),
                power1: token("POWER1"),
                power2: token("POWER2"),
                power3: token("POWER3"),
                power4: token("POWER4"),
                power5: token("POWER5"),
                power6: token("POWER6"),
                power7: token("POWER7"),
                power8: token("POWER8"),
            });
        }

        let trimmed = body.trim();
        if trimmed.eq_ignore_ascii_case("ON") || trimmed.eq_ignore_ascii_case("OFF") {
            return Ok(Self {
                power: Some(trimmed.to_string()),
                ..Self::default()
            });
        }

        Err(Error::UnexpectedResponse(trimmed.to_string()))
    }

    /// Extracts the power state for a relay.
    ///
    /// Key precedence: the numbered key first when a numbered relay is
    /// configured, then the bare `POWER` key as fallback. Returns `None` when
    /// neither key is present or the value is not an ON/OFF token; the caller
    /// treats that as an inconclusive cycle and leaves its cache unchanged.
    #[must_use]
    pub fn state_for(&self, relay: RelayIndex) -> Option<PowerState> {
        let token = match relay.value() {
            1 => self.power1.as_ref().or(self.power.as_ref()),
            2 => self.power2.as_ref().or(self.power.as_ref()),
            3 => self.power3.as_ref().or(self.power.as_ref()),
            4 => self.power4.as_ref().or(self.power.as_ref()),
            5 => self.power5.as_ref().or(self.power.as_ref()),
            6 => self.power6.as_ref().or(self.power.as_ref()),
            7 => self.power7.as_ref().or(self.power.as_ref()),
            8 => self.power8.as_ref().or(self.power.as_ref()),
            _ => self.power.as_ref(),
        };

        token.and_then(|t| t.parse().ok())
    }
}
