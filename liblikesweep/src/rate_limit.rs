//! Rate-limit reset parsing
//!
//! A 429 from the delete endpoint carries `x-rate-limit-reset`, the epoch
//! second at which the account's window reopens. The sweep sleeps until
//! then; a missing or garbled header falls back to a fixed wait.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

pub const RESET_HEADER: &str = "x-rate-limit-reset";

/// Point in time after which requests are permitted again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSignal {
    pub reset_at: DateTime<Utc>,
}

impl RateLimitSignal {
    /// Parse the raw header value as integer epoch seconds
    pub fn from_header(value: Option<&str>) -> Option<Self> {
        let raw = match value {
            Some(raw) => raw,
            None => {
                tracing::warn!("Rate limit response has no {} header", RESET_HEADER);
                return None;
            }
        };

        let seconds = match raw.trim().parse::<i64>() {
            Ok(seconds) => seconds,
            Err(e) => {
                tracing::warn!("Error parsing rate limit reset time {:?}: {}", raw, e);
                return None;
            }
        };

        match Utc.timestamp_opt(seconds, 0).single() {
            Some(reset_at) => Some(Self { reset_at }),
            None => {
                tracing::warn!("Rate limit reset time {} is out of range", seconds);
                None
            }
        }
    }

    /// Time left until the reset, zero if it has already passed
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Pause length after a 429: until the reset, or `fallback` without one
pub fn wait_for(
    signal: Option<RateLimitSignal>,
    now: DateTime<Utc>,
    fallback: Duration,
) -> Duration {
    match signal {
        Some(signal) => signal.remaining(now),
        None => fallback,
    }
}
