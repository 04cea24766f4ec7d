//! Error types for the OTP subsystem.
//!
//! This module defines the `AuthError` enum which represents all possible
//! errors that can occur while issuing, verifying, or sweeping one-time codes.

use thiserror::Error;

/// The main error type for OTP operations.
///
/// Variants fall into the four classes callers care about: rate limiting,
/// verification failures (mismatch and expiry), storage failures, and input or
/// configuration problems.
#[derive(Debug, Error)]
pub enum AuthError {
    // ==================== Verification Errors ====================
    /// No live record matched the submitted code.
    ///
    /// Deliberately covers both "wrong code" and "no such code" so callers
    /// cannot learn which one happened.
    #[error("Invalid or expired OTP.")]
    InvalidOtp,

    /// A record matched but its expiry has passed. The record is consumed.
    #[error("OTP has expired. Please request a new one.")]
    OtpExpired,

    // ==================== Rate Limiting ====================
    /// Too many codes were issued for the identity and purpose.
    #[error("Too many OTP requests. Please try again in {wait_minutes} minutes.")]
    RateLimitExceeded { wait_minutes: i64 },

    // ==================== Validation Errors ====================
    /// A required field is missing.
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A field value is invalid.
    #[error("Invalid field value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    // ==================== Storage Errors ====================
    /// A store operation failed.
    #[error("Database error: {message}")]
    DatabaseError { message: String },

    /// The requested record was not found.
    #[error("Record not found: {entity} with {key}={value}")]
    NotFound {
        entity: String,
        key: String,
        value: String,
    },

    // ==================== Configuration Errors ====================
    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl AuthError {
    /// Creates a new database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::DatabaseError {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(
        entity: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a new missing field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a new invalid field error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Returns true if this is a user-facing error (vs internal).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidOtp
                | Self::OtpExpired
                | Self::RateLimitExceeded { .. }
                | Self::MissingField { .. }
                | Self::InvalidField { .. }
        )
    }

    /// Returns true if the error came from the persistence layer.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::DatabaseError { .. } | Self::NotFound { .. })
    }

    /// Returns the wait hint carried by a rate-limit error.
    pub fn retry_after_minutes(&self) -> Option<i64> {
        match self {
            Self::RateLimitExceeded { wait_minutes } => Some(*wait_minutes),
            _ => None,
        }
    }

    /// Returns a machine-readable error code for logs and API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidOtp => "INVALID_OTP",
            Self::OtpExpired => "OTP_EXPIRED",
            Self::RateLimitExceeded { .. } => "RATE_LIMITED",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::DatabaseError { .. } | Self::NotFound { .. } => "STORE_FAILURE",
            Self::ConfigurationError { .. } => "CONFIGURATION_ERROR",
        }
    }
}

/// A Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
