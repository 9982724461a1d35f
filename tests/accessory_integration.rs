// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end accessory tests against a mock Tasmota device.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tasmota_bridge::{AccessoryConfig, PowerState, RelayIndex, RetryPolicy, SwitchAccessory};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// A mock relay that mutates its state on `Power<n> ON|OFF` and reports it
/// on a bare query, answering under `reply_key` like real firmware does.
struct FakeRelay {
    state: Arc<Mutex<bool>>,
    reply_key: &'static str,
}

impl FakeRelay {
    fn new(initial: bool, reply_key: &'static str) -> (Self, Arc<Mutex<bool>>) {
        let state = Arc::new(Mutex::new(initial));
        (
            Self {
                state: state.clone(),
                reply_key,
            },
            state,
        )
    }
}

impl Respond for FakeRelay {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let cmnd = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "cmnd")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        let mut state = self.state.lock();
        if let Some((_, arg)) = cmnd.split_once(' ') {
            *state = arg.eq_ignore_ascii_case("ON");
        }

        let token = if *state { "ON" } else { "OFF" };
        let mut body = serde_json::Map::new();
        body.insert(
            self.reply_key.to_string(),
            serde_json::Value::String(token.to_string()),
        );
        ResponseTemplate::new(200).set_body_json(serde_json::Value::Object(body))
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

fn accessory(server: &MockServer) -> SwitchAccessory {
    accessory_with_config(AccessoryConfig::new(server.uri()))
}

fn accessory_with_config(config: AccessoryConfig) -> SwitchAccessory {
    SwitchAccessory::with_retry_policy(config, fast_retry()).unwrap()
}

fn record_events(accessory: &SwitchAccessory) -> Arc<Mutex<Vec<bool>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    accessory.on_state_changed(move |on| events_clone.lock().push(on));
    events
}

mod read_cycle {
    use super::*;

    #[tokio::test]
    async fn initial_on_read_notifies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        let events = record_events(&acc);

        acc.refresh().await;

        assert!(acc.cached_on());
        assert_eq!(*events.lock(), vec![true]);
    }

    #[tokio::test]
    async fn initial_off_read_is_silent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "OFF"
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        let events = record_events(&acc);

        acc.refresh().await;

        // The host already assumed OFF for the unknown state.
        assert!(!acc.cached_on());
        assert_eq!(acc.cached_state(), Some(PowerState::Off));
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn numbered_relay_sends_numbered_command() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER2": "ON"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let acc = accessory_with_config(
            AccessoryConfig::new(server.uri()).with_relay(RelayIndex::new(2).unwrap()),
        );

        acc.refresh().await;

        assert!(acc.cached_on());
    }

    #[tokio::test]
    async fn plain_text_reply_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ON\n"))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        acc.refresh().await;

        assert!(acc.cached_on());
    }

    #[tokio::test]
    async fn unparsable_reply_keeps_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(200).set_body_string("WARNING: upgrading"))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        acc.refresh().await;
        assert!(acc.cached_on());

        // Second cycle: every retry returns garbage. The cache survives.
        acc.refresh().await;
        assert!(acc.cached_on());
    }

    #[tokio::test]
    async fn missing_power_key_is_inconclusive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Dimmer": 50
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        let events = record_events(&acc);

        acc.refresh().await;

        assert_eq!(acc.cached_state(), None);
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn credentials_are_sent_as_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("user", "admin"))
            .and(query_param("password", "secret"))
            .and(query_param("cmnd", "Power"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let acc = accessory_with_config(
            AccessoryConfig::new(server.uri()).with_credentials("admin", "secret"),
        );

        acc.refresh().await;
        assert!(acc.cached_on());
    }
}

mod retries {
    use super::*;

    #[tokio::test]
    async fn read_retries_exactly_the_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let acc = accessory(&server);
        acc.refresh().await;

        // Exhausted reads leave the cache alone; the mock verifies the
        // attempt count on drop.
        assert_eq!(acc.cached_state(), None);
        assert!(!acc.cached_on());
    }

    #[tokio::test]
    async fn read_recovers_within_the_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        acc.refresh().await;

        assert!(acc.cached_on());
    }
}

mod write_cycle {
    use super::*;

    #[tokio::test]
    async fn round_trip_converges_with_one_notification() {
        let server = MockServer::start().await;
        let (relay, device_state) = FakeRelay::new(false, "POWER");
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(relay)
            .mount(&server)
            .await;

        let acc = accessory(&server);
        let events = record_events(&acc);

        acc.set_power(true).await.unwrap();

        assert!(*device_state.lock());
        assert!(acc.cached_on());
        // Optimistic notification only; the confirming read agreed.
        assert_eq!(*events.lock(), vec![true]);

        // A later poll of the same state stays silent.
        acc.refresh().await;
        assert_eq!(*events.lock(), vec![true]);
    }

    #[tokio::test]
    async fn ambiguous_ack_still_succeeds() {
        // Write to relay 1, but the firmware acknowledges under the bare
        // POWER key. That counts as a matching acknowledgement.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power1 ON"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER1": "ON"
            })))
            .mount(&server)
            .await;

        let acc = accessory_with_config(
            AccessoryConfig::new(server.uri()).with_relay(RelayIndex::new(1).unwrap()),
        );

        acc.set_power(true).await.unwrap();
        assert!(acc.cached_on());
    }

    #[tokio::test]
    async fn numeric_ack_succeeds_without_retry() {
        // Some firmware builds acknowledge with a numeric value. The write
        // must not burn its retry budget on that.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power ON"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": 1
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        acc.set_power(true).await.unwrap();
        assert!(acc.cached_on());
    }

    #[tokio::test]
    async fn unparsable_2xx_ack_still_succeeds() {
        // A 2xx write response counts as success even when the body is
        // garbage; only the confirming read decides the cache.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power ON"))
            .respond_with(ResponseTemplate::new(200).set_body_string("WARNING: update in progress"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        acc.set_power(true).await.unwrap();
        assert!(acc.cached_on());
    }

    #[tokio::test]
    async fn failed_write_runs_corrective_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power ON"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", "Power"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "OFF"
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        let events = record_events(&acc);

        let result = acc.set_power(true).await;

        assert!(result.is_err());
        // Optimistic ON, then the corrective read reverted to OFF.
        assert_eq!(*events.lock(), vec![true, false]);
        assert!(!acc.cached_on());
    }

    #[tokio::test]
    async fn request_set_reports_success_through_callback() {
        let server = MockServer::start().await;
        let (relay, _) = FakeRelay::new(false, "POWER");
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(relay)
            .mount(&server)
            .await;

        let acc = accessory(&server);
        let (tx, rx) = tokio::sync::oneshot::channel();

        acc.request_set(true, move |err| {
            tx.send(err).ok();
        });

        // Optimistic update is visible before the device answered.
        assert!(acc.cached_on());

        let err = rx.await.unwrap();
        assert!(err.is_none());
        assert!(acc.cached_on());
    }
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn numbered_relay_full_session() {
        let server = MockServer::start().await;
        let (relay, device_state) = FakeRelay::new(false, "POWER2");
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(relay)
            .mount(&server)
            .await;

        let config = AccessoryConfig::from_json(&format!(
            r#"{{"name": "Garage", "hostname": "{}", "relay": "2"}}"#,
            server.uri()
        ))
        .unwrap();
        let acc = accessory_with_config(config);
        let events = record_events(&acc);

        // Initial read: device is OFF, matches the assumed state.
        acc.refresh().await;
        assert!(events.lock().is_empty());

        // User turns the switch on.
        acc.set_power(true).await.unwrap();
        assert!(*device_state.lock());
        assert_eq!(*events.lock(), vec![true]);

        // Poll confirms, no duplicate notification.
        acc.refresh().await;
        assert_eq!(*events.lock(), vec![true]);

        // Someone hits the physical button; the next poll picks it up.
        *device_state.lock() = false;
        acc.refresh().await;
        assert_eq!(*events.lock(), vec![true, false]);
        assert!(!acc.cached_on());
    }

    #[tokio::test]
    async fn start_runs_initial_read_and_arms_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "POWER": "ON"
            })))
            .mount(&server)
            .await;

        let acc = accessory(&server);
        acc.start().await;

        assert!(acc.cached_on());
        assert!(acc.is_polling());

        acc.shutdown();
        assert!(!acc.is_polling());
    }
}
