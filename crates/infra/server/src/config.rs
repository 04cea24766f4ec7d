//! Server configuration.

use carwash_auth_core::{AuthError, AuthResult};
use carwash_auth_email_otp::EmailOtpConfig;
use carwash_auth_otp_utils::{CodeStorage, RateLimitConfig};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Server-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Log level, or any `tracing-subscriber` filter directive.
    pub log_level: String,
    /// Seconds between maintenance sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sweep_interval_secs: 300, // 5 minutes
        }
    }
}

/// Bucket-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// OTP settings for this bucket.
    pub otp: OtpSettings,
}

/// OTP settings as written in the config file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSettings {
    pub otp_length: usize,
    /// Seconds.
    pub expires_in: u64,
    pub rate_limit_enabled: bool,
    pub max_requests: u32,
    pub window_minutes: i64,
    /// Seconds a used record is kept before cleanup.
    pub used_retention: u64,
    pub tolerate_replay: bool,
    pub app_name: String,
    /// When set, codes are stored as a keyed hash instead of plain text.
    pub hash_secret: Option<String>,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            otp_length: 6,
            expires_in: 600,
            rate_limit_enabled: true,
            max_requests: 5,
            window_minutes: 60,
            used_retention: 24 * 60 * 60,
            tolerate_replay: false,
            app_name: "Carwash".to_string(),
            hash_secret: None,
        }
    }
}

impl OtpSettings {
    /// Builds and validates the service configuration these settings describe.
    pub fn to_email_otp_config(&self) -> AuthResult<EmailOtpConfig> {
        let rate_limit = if self.rate_limit_enabled {
            let window = Duration::try_minutes(self.window_minutes).ok_or_else(|| {
                AuthError::config(format!("window_minutes {} is out of range", self.window_minutes))
            })?;
            RateLimitConfig::new(self.max_requests, window)
        } else {
            RateLimitConfig::disabled()
        };
        let storage = match &self.hash_secret {
            Some(secret) => CodeStorage::hashed(secret),
            None => CodeStorage::plain(),
        };

        let config = EmailOtpConfig::new()
            .otp_length(self.otp_length)
            .expires_in(self.expires_in)
            .rate_limit(rate_limit)
            .used_retention(self.used_retention)
            .app_name(self.app_name.clone())
            .store_otp(storage);

        let config = if self.tolerate_replay {
            config.tolerate_replay()
        } else {
            config
        };
        config.validate()?;
        Ok(config)
    }
}

impl std::fmt::Debug for OtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpSettings")
            .field("otp_length", &self.otp_length)
            .field("expires_in", &self.expires_in)
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("max_requests", &self.max_requests)
            .field("window_minutes", &self.window_minutes)
            .field("used_retention", &self.used_retention)
            .field("tolerate_replay", &self.tolerate_replay)
            .field("app_name", &self.app_name)
            .field("hash_secret", &self.hash_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Loads configuration from a TOML file.
pub fn load_config(
    path: impl AsRef<Path>,
) -> Result<(ServerConfig, HashMap<String, BucketConfig>), ConfigError> {
    let content =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError(e.to_string()))?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(
    content: &str,
) -> Result<(ServerConfig, HashMap<String, BucketConfig>), ConfigError> {
    let config: toml::Value =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    // Parse server config
    let server: ServerConfig = config
        .get("server")
        .map(|v| toml::Value::try_into(v.clone()))
        .transpose()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?
        .unwrap_or_default();

    if server.sweep_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "server.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    // Parse bucket configs
    let mut buckets = HashMap::new();
    if let Some(buckets_table) = config.get("buckets").and_then(|v| v.as_table()) {
        for (name, value) in buckets_table {
            let bucket: BucketConfig = toml::Value::try_into(value.clone())
                .map_err(|e| ConfigError::ParseError(format!("bucket '{name}': {e}")))?;
            bucket
                .otp
                .to_email_otp_config()
                .map_err(|e| ConfigError::Invalid(format!("bucket '{name}': {e}")))?;
            buckets.insert(name.clone(), bucket);
        }
    }

    Ok((server, buckets))
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
