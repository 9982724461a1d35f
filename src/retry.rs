// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded retry for device requests.
//!
//! Attempts run strictly in sequence; the next attempt never starts before
//! the previous one has failed. The inter-attempt delay is fixed, not scaled
//! by attempt number. After the last attempt the last error is returned and
//! no further action is taken.

use std::time::Duration;

use crate::error::Result;

/// Retry policy for read and write cycles.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tasmota_bridge::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Default total attempts per operation.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default fixed delay between attempts.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

    /// Creates a policy with the given attempt budget and fixed delay.
    ///
    /// `max_attempts` counts the first attempt too; it is clamped to at
    /// least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Returns the total attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the fixed inter-attempt delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs an operation with bounded retries.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once the budget is exhausted.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_cancellable(|| false, op).await
    }

    /// Runs an operation with bounded retries and a cancellation check.
    ///
    /// `cancelled` is consulted after each failed attempt; once it returns
    /// `true` the chain stops immediately with the last error, without
    /// arming another delay. Used during accessory teardown.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once the budget is exhausted or the
    /// chain is cancelled.
    pub async fn run_cancellable<T, F, Fut, C>(&self, cancelled: C, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn() -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            attempts = self.max_attempts,
                            error = %err,
                            "giving up after final attempt"
                        );
                        return Err(err);
                    }
                    if cancelled() {
                        tracing::debug!(attempt, "retry chain cancelled");
                        return Err(err);
                    }
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}
