// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tasmota Bridge - expose a Tasmota relay to a smart-home host as a switch.
//!
//! The bridge keeps a cached power state for one relay of a Tasmota device,
//! reconciles it with the device over the HTTP web API, and notifies the host
//! only on actual state transitions.
//!
//! # How it works
//!
//! - **Reads** poll `Power<relay>` on a configurable interval and after every
//!   write; replies are parsed as JSON (`{"POWER":"ON"}`) with a plain-text
//!   `ON`/`OFF` fallback.
//! - **Writes** update the cache optimistically, send `Power<relay> ON|OFF`,
//!   then confirm with a follow-up read. A failed write triggers a corrective
//!   read so the cache tracks the device, not the wish.
//! - **Retries** are bounded and sequential with a fixed delay; exhausted
//!   reads keep the cached state valid.
//!
//! # Quick Start
//!
//! ```no_run
//! use tasmota_bridge::{AccessoryConfig, SwitchAccessory};
//!
//! #[tokio::main]
//! async fn main() -> tasmota_bridge::Result<()> {
//!     let config = AccessoryConfig::new("192.168.1.50").with_name("Garage Light");
//!     let accessory = SwitchAccessory::new(config)?;
//!
//!     accessory.on_state_changed(|on| {
//!         println!("switch is now {}", if on { "ON" } else { "OFF" });
//!     });
//!
//!     accessory.start().await;
//!     accessory.run_until_shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Host config block
//!
//! The host platform's JSON config is accepted directly, including its
//! legacy coercions (`user` alias, string relay numbers, lenient
//! `pollInterval`):
//!
//! ```
//! use tasmota_bridge::AccessoryConfig;
//!
//! let config = AccessoryConfig::from_json(
//!     r#"{"name": "Lamp", "hostname": "192.168.1.50", "relay": "2"}"#,
//! ).unwrap();
//! assert_eq!(config.relay().value(), 2);
//! ```

pub mod accessory;
pub mod command;
pub mod config;
pub mod error;
pub mod response;
pub mod retry;
pub mod subscription;
pub mod transport;
pub mod types;

pub use accessory::SwitchAccessory;
pub use command::{Command, PowerCommand};
pub use config::{AccessoryConfig, DEFAULT_POLL_SECONDS, MIN_POLL_SECONDS};
pub use error::{Error, Result, TransportError};
pub use response::PowerReply;
pub use retry::RetryPolicy;
pub use subscription::{CallbackRegistry, SubscriptionId};
pub use transport::HttpClient;
pub use types::{PowerState, RelayIndex};
