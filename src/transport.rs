// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport to the device.
//!
//! Uses the Tasmota web API endpoint `/cm?cmnd=<command>` with optional
//! `user`/`password` query parameters. Each request carries a fixed timeout;
//! timeouts and non-2xx statuses are transport errors, eligible for retry.

use std::time::Duration;

use reqwest::Client;

use crate::command::Command;
use crate::error::{Error, TransportError};
use crate::response::PowerReply;

/// HTTP client for a single Tasmota device.
///
/// # Examples
///
/// ```no_run
/// use tasmota_bridge::{HttpClient, PowerCommand, RelayIndex};
///
/// # async fn example() -> tasmota_bridge::Result<()> {
/// let client = HttpClient::new("192.168.1.50")?;
/// let reply = client.fetch(&PowerCommand::query(RelayIndex::bare())).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
    timeout: Duration,
    username: Option<String>,
    password: Option<String>,
}

impl HttpClient {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

    /// Creates a client for the given host with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be created.
    pub fn new(host: impl Into<String>) -> Result<Self, Error> {
        Self::with_timeout(host, Self::DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be created.
    pub fn with_timeout(host: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let host = host.into();
        let base_url = if host.starts_with("http://") {
            host
        } else {
            format!("http://{host}")
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Http)?;

        Ok(Self {
            base_url,
            client,
            timeout,
            username: None,
            password: None,
        })
    }

    /// Sets the `user` query parameter sent with every request.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the `password` query parameter sent with every request.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Returns the base URL of the device.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the URL for a command string.
    fn build_url(&self, command: &str) -> String {
        let mut url = format!("{}/cm?", self.base_url);
        if let Some(user) = &self.username {
            url.push_str("user=");
            url.push_str(&urlencoding::encode(user));
            url.push('&');
        }
        if let Some(password) = &self.password {
            url.push_str("password=");
            url.push_str(&urlencoding::encode(password));
            url.push('&');
        }
        url.push_str("cmnd=");
        url.push_str(&urlencoding::encode(command));
        url
    }

    /// Sends a command and parses the power reply.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network failure, timeout, or a non-2xx
    /// status; [`Error::UnexpectedResponse`] if the body is unparsable.
    pub async fn fetch<C: Command + Sync>(&self, command: &C) -> Result<PowerReply, Error> {
        let url = self.build_url(&command.to_http_command());

        tracing::debug!(url = %url, "sending command");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }
            .into());
        }

        let body = response.text().await.map_err(TransportError::Http)?;

        tracing::debug!(body = %body, "received reply");

        PowerReply::from_body(&body)
    }
}
