//! Rate limiting utilities.
//!
//! Issuance history lives in the OTP store itself, so the limiter counts
//! records rather than keeping counters of its own. The window slides with
//! the current instant; there are no aligned buckets.

use carwash_auth_core::{AuthResult, Clock, OtpFilter, OtpPurpose, OtpStore, RecordOrdering};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Configuration for rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of codes issued within the time window.
    pub max_requests: u32,
    /// Time window duration.
    pub time_window: Duration,
    /// Whether rate limiting is enabled.
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::for_otp_send()
    }
}

impl RateLimitConfig {
    /// Creates a new rate limit config.
    pub fn new(max_requests: u32, time_window: Duration) -> Self {
        Self {
            max_requests,
            time_window,
            enabled: true,
        }
    }

    /// Disables rate limiting.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::for_otp_send()
        }
    }

    /// Five codes per identity and purpose per hour.
    pub fn for_otp_send() -> Self {
        Self::new(5, Duration::minutes(60))
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Issuance may proceed.
    Allowed {
        /// Codes still available in the current window, this one included.
        remaining: u32,
    },
    /// Issuance is blocked.
    Limited {
        /// Whole minutes to wait, never less than one.
        wait_minutes: i64,
        /// When the oldest counted record leaves the window.
        retry_at: DateTime<Utc>,
    },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Returns true if the request is rate limited.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitResult::Limited { .. })
    }
}

/// `ceil(window - elapsed)` in minutes, floored at one.
pub fn wait_minutes(window: Duration, elapsed: Duration) -> i64 {
    let remaining_ms = (window - elapsed).num_milliseconds();
    if remaining_ms <= 0 {
        return 1;
    }
    let minutes = remaining_ms / 60_000 + i64::from(remaining_ms % 60_000 != 0);
    minutes.max(1)
}

/// Store-backed sliding-window rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn OtpStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a new rate limiter over the given store.
    pub fn new(store: Arc<dyn OtpStore>, clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Gets the limiter configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks whether another code may be issued for the pair.
    ///
    /// Read-only: the issuance itself writes the record that the next check
    /// will count.
    pub async fn check(&self, identity: &str, purpose: OtpPurpose) -> AuthResult<RateLimitResult> {
        if !self.config.enabled {
            return Ok(RateLimitResult::Allowed {
                remaining: u32::MAX,
            });
        }

        let now = self.clock.now();
        let window_start = now
            .checked_sub_signed(self.config.time_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let recent = OtpFilter::for_pair(identity, purpose).created_since(window_start);

        let count = self.store.count(&recent).await?;
        let max = self.config.max_requests as usize;
        if count < max {
            return Ok(RateLimitResult::Allowed {
                remaining: (max - count) as u32,
            });
        }

        let oldest = self
            .store
            .find_first(&recent, RecordOrdering::OldestFirst)
            .await?;
        // A sweep may have removed the oldest row between the two reads.
        let oldest_at = oldest.map(|r| r.created_at).unwrap_or(now);

        let wait = wait_minutes(self.config.time_window, now - oldest_at);
        tracing::debug!(
            purpose = %purpose,
            count,
            wait_minutes = wait,
            "otp issuance rate limited"
        );

        Ok(RateLimitResult::Limited {
            wait_minutes: wait,
            retry_at: oldest_at
                .checked_add_signed(self.config.time_window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }
}
