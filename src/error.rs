// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge core.
//!
//! Read cycles never surface errors to the host bridge; they are logged and
//! the cached state stays valid. Write cycles report the final transport
//! outcome through the completion callback. An ambiguous acknowledgement is
//! not an error at all: it is logged and treated as success.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The network transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device reply was neither a JSON object nor a bare ON/OFF token.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The accessory configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors raised by the HTTP transport.
///
/// Timeouts are transport errors and therefore eligible for retry, like any
/// other network failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request failed at the network level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request exceeded the transport timeout.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The device answered with a non-success status code.
    #[error("HTTP {code} - {reason}")]
    Status {
        /// The HTTP status code.
        code: u16,
        /// The canonical reason phrase, or "Unknown".
        reason: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
