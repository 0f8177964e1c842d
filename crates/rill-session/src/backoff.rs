// SPDX-FileCopyrightText: 2026 Rill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capped exponential backoff for transport-feed reconnects.

use std::time::Duration;

/// Doubles the delay on each attempt until the cap is reached.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// The delay before the next attempt. Advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        // Cap the shift so the multiplier cannot overflow.
        let shift = self.attempt.min(16);
        let delay = self
            .base
            .saturating_mul(1u32 << shift)
            .min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Resets after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
