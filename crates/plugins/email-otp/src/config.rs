//! Configuration for the Email OTP service.

use carwash_auth_core::{AuthError, AuthResult, OtpPurpose};
use carwash_auth_otp_utils::{CodeStorage, OtpConfig, RateLimitConfig};
use chrono::Duration;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::message::OtpMessage;

/// Longest accepted code lifetime, in seconds (one day).
pub const MAX_EXPIRES_IN: u64 = 24 * 60 * 60;
/// Longest accepted retention for used records, in seconds (one year).
pub const MAX_USED_RETENTION: u64 = 366 * 24 * 60 * 60;
/// Longest accepted rate-limit window, in days.
pub const MAX_RATE_LIMIT_WINDOW_DAYS: i64 = 31;

/// Data passed to the send callback.
#[derive(Debug, Clone)]
pub struct EmailOtpData {
    /// The email address to send the OTP to.
    pub email: String,
    /// The OTP code.
    pub otp: String,
    /// The purpose of the OTP.
    pub otp_type: OtpPurpose,
    /// Rendered subject and body.
    pub message: OtpMessage,
}

impl EmailOtpData {
    /// Creates new OTP data.
    pub fn new(
        email: impl Into<String>,
        otp: impl Into<String>,
        otp_type: OtpPurpose,
        message: OtpMessage,
    ) -> Self {
        Self {
            email: email.into(),
            otp: otp.into(),
            otp_type,
            message,
        }
    }
}

/// Type alias for the send OTP callback.
pub type SendOtpCallback = Arc<
    dyn Fn(EmailOtpData) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>>
        + Send
        + Sync,
>;

/// Type alias for custom OTP generator.
pub type OtpGeneratorFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Configuration for the Email OTP service.
#[derive(Clone)]
pub struct EmailOtpConfig {
    /// Length of the OTP code. Default: 6.
    pub otp_length: usize,
    /// OTP expiration time in seconds. Default: 600 (10 minutes).
    pub expires_in: u64,
    /// Issuance rate limit per identity and purpose. Default: 5 per hour.
    pub rate_limit: RateLimitConfig,
    /// How long used records are kept before cleanup, in seconds. Default: 86400.
    pub used_retention: u64,
    /// Whether an already-used record may verify again. Default: false.
    pub tolerate_replay: bool,
    /// Product name shown in rendered messages.
    pub app_name: String,
    /// Callback to send the OTP.
    pub send_verification_otp: Option<SendOtpCallback>,
    /// Custom OTP generator function.
    pub generate_otp: Option<OtpGeneratorFn>,
    /// How to store OTPs at rest.
    pub store_otp: CodeStorage,
}

impl Default for EmailOtpConfig {
    fn default() -> Self {
        Self {
            otp_length: 6,
            expires_in: 600, // 10 minutes
            rate_limit: RateLimitConfig::for_otp_send(),
            used_retention: 24 * 60 * 60,
            tolerate_replay: false,
            app_name: "Carwash".to_string(),
            send_verification_otp: None,
            generate_otp: None,
            store_otp: CodeStorage::plain(),
        }
    }
}

impl EmailOtpConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OTP length.
    pub fn otp_length(mut self, length: usize) -> Self {
        self.otp_length = length;
        self
    }

    /// Sets the expiration time in seconds.
    pub fn expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = seconds;
        self
    }

    /// Sets the issuance rate limit.
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Sets how long used records survive cleanup, in seconds.
    pub fn used_retention(mut self, seconds: u64) -> Self {
        self.used_retention = seconds;
        self
    }

    /// Lets an already-used record verify again, reported as `was_already_used`.
    pub fn tolerate_replay(mut self) -> Self {
        self.tolerate_replay = true;
        self
    }

    /// Sets the product name used in messages.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets the send OTP callback.
    pub fn send_verification_otp<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(EmailOtpData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        self.send_verification_otp = Some(Arc::new(move |data| Box::pin(callback(data))));
        self
    }

    /// Sets a custom OTP generator.
    pub fn generate_otp_with<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.generate_otp = Some(Arc::new(generator));
        self
    }

    /// Sets the OTP storage mode.
    pub fn store_otp(mut self, storage: CodeStorage) -> Self {
        self.store_otp = storage;
        self
    }

    /// Expiry window as a duration, capped at [`MAX_EXPIRES_IN`].
    pub fn expires_in_duration(&self) -> Duration {
        Duration::seconds(self.expires_in.min(MAX_EXPIRES_IN) as i64)
    }

    /// Expiry window in whole minutes, rounded up.
    pub fn expires_in_minutes(&self) -> u64 {
        self.expires_in.min(MAX_EXPIRES_IN).div_ceil(60)
    }

    /// Used-record retention as a duration, capped at [`MAX_USED_RETENTION`].
    pub fn used_retention_duration(&self) -> Duration {
        Duration::seconds(self.used_retention.min(MAX_USED_RETENTION) as i64)
    }

    /// Checks the configuration is usable.
    pub fn validate(&self) -> AuthResult<()> {
        OtpConfig::numeric(self.otp_length).validate()?;

        if self.expires_in == 0 || self.expires_in > MAX_EXPIRES_IN {
            return Err(AuthError::config(format!(
                "expires_in must be between 1 and {MAX_EXPIRES_IN} seconds"
            )));
        }
        if self.used_retention == 0 || self.used_retention > MAX_USED_RETENTION {
            return Err(AuthError::config(format!(
                "used_retention must be between 1 and {MAX_USED_RETENTION} seconds"
            )));
        }
        if self.rate_limit.enabled {
            if self.rate_limit.max_requests == 0 {
                return Err(AuthError::config("rate limit max_requests must be greater than zero"));
            }
            let window = self.rate_limit.time_window;
            if window <= Duration::zero() || window > Duration::days(MAX_RATE_LIMIT_WINDOW_DAYS) {
                return Err(AuthError::config(format!(
                    "rate limit time_window must be positive and at most \
                     {MAX_RATE_LIMIT_WINDOW_DAYS} days"
                )));
            }
        }

        self.store_otp.validate()
    }
}

impl std::fmt::Debug for EmailOtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailOtpConfig")
            .field("otp_length", &self.otp_length)
            .field("expires_in", &self.expires_in)
            .field("rate_limit", &self.rate_limit)
            .field("used_retention", &self.used_retention)
            .field("tolerate_replay", &self.tolerate_replay)
            .field("app_name", &self.app_name)
            .field("send_verification_otp", &self.send_verification_otp.is_some())
            .field("generate_otp", &self.generate_otp.is_some())
            .field("store_otp", &self.store_otp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmailOtpConfig::default();
        assert_eq!(config.otp_length, 6);
        assert_eq!(config.expires_in_duration(), Duration::minutes(10));
        assert_eq!(config.expires_in_minutes(), 10);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.used_retention_duration(), Duration::hours(24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(EmailOtpConfig::new().otp_length(0).validate().is_err());
        assert!(EmailOtpConfig::new().expires_in(0).validate().is_err());
        assert!(EmailOtpConfig::new().used_retention(0).validate().is_err());
        assert!(
            EmailOtpConfig::new()
                .rate_limit(RateLimitConfig::new(0, Duration::minutes(60)))
                .validate()
                .is_err()
        );
        assert!(
            EmailOtpConfig::new()
                .store_otp(CodeStorage::hashed(""))
                .validate()
                .is_err()
        );
        // A disabled limiter is not checked.
        assert!(
            EmailOtpConfig::new()
                .rate_limit(RateLimitConfig::disabled())
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validation_rejects_oversized_values() {
        assert!(EmailOtpConfig::new().expires_in(MAX_EXPIRES_IN).validate().is_ok());
        assert!(EmailOtpConfig::new().expires_in(MAX_EXPIRES_IN + 1).validate().is_err());
        assert!(EmailOtpConfig::new().expires_in(u64::MAX).validate().is_err());
        assert!(EmailOtpConfig::new().used_retention(u64::MAX).validate().is_err());
        assert!(
            EmailOtpConfig::new()
                .rate_limit(RateLimitConfig::new(5, Duration::days(365)))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_durations_never_wrap() {
        let config = EmailOtpConfig::new()
            .expires_in(u64::MAX)
            .used_retention(u64::MAX);

        assert_eq!(config.expires_in_duration(), Duration::days(1));
        assert!(config.used_retention_duration() > Duration::zero());
        assert_eq!(config.expires_in_minutes(), 24 * 60);
    }

    #[test]
    fn test_expiry_minutes_round_up() {
        assert_eq!(EmailOtpConfig::new().expires_in(90).expires_in_minutes(), 2);
        assert_eq!(EmailOtpConfig::new().expires_in(60).expires_in_minutes(), 1);
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let config = EmailOtpConfig::new()
            .generate_otp_with(|| "123456".to_string())
            .send_verification_otp(|_| async { Ok::<(), String>(()) });
        let debug = format!("{config:?}");
        assert!(debug.contains("generate_otp: true"));
        assert!(debug.contains("send_verification_otp: true"));
    }
}
