//! Core data types for the OTP subsystem.
//!
//! This module defines `OtpPurpose`, the persisted `OtpRecord`, and the
//! `NewOtpRecord` insert shape handed to a store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// The flow a one-time code is scoped to.
///
/// A code issued for one purpose never verifies for another, which prevents
/// cross-flow replay (a password reset code cannot confirm an email).
///
/// # Example
///
/// ```rust
/// use carwash_auth_core::OtpPurpose;
///
/// let purpose: OtpPurpose = "EMAIL_VERIFICATION".parse().unwrap();
/// assert_eq!(purpose, OtpPurpose::EmailVerification);
/// assert_eq!(purpose.as_str(), "EMAIL_VERIFICATION");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    /// Code for resetting a forgotten password.
    PasswordReset,
    /// Code for proving ownership of an email address.
    EmailVerification,
    /// Second factor during sign-in.
    TwoFactorAuth,
}

impl OtpPurpose {
    /// All purposes, in declaration order.
    pub const ALL: [OtpPurpose; 3] = [
        OtpPurpose::PasswordReset,
        OtpPurpose::EmailVerification,
        OtpPurpose::TwoFactorAuth,
    ];

    /// Returns the wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::PasswordReset => "PASSWORD_RESET",
            OtpPurpose::EmailVerification => "EMAIL_VERIFICATION",
            OtpPurpose::TwoFactorAuth => "TWO_FACTOR_AUTH",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpPurpose {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASSWORD_RESET" => Ok(OtpPurpose::PasswordReset),
            "EMAIL_VERIFICATION" => Ok(OtpPurpose::EmailVerification),
            "TWO_FACTOR_AUTH" => Ok(OtpPurpose::TwoFactorAuth),
            "" => Err(AuthError::missing("purpose")),
            other => Err(AuthError::invalid(
                "purpose",
                format!(
                    "unknown purpose '{other}'. Must be one of: \
                     PASSWORD_RESET, EMAIL_VERIFICATION, TWO_FACTOR_AUTH"
                ),
            )),
        }
    }
}

/// A persisted one-time code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    /// Unique identifier, assigned by the store.
    pub id: String,

    /// Identity the code was issued for (an email address).
    pub identity: String,

    /// Stored form of the code. Plain digits or a keyed hash, depending on
    /// how the issuer was configured.
    pub code: String,

    /// Flow the code is scoped to.
    pub purpose: OtpPurpose,

    /// After this instant the code is invalid regardless of `is_used`.
    pub expires_at: DateTime<Utc>,

    /// True once consumed or invalidated by a newer issuance.
    pub is_used: bool,

    /// Creation instant; drives rate-limit windows and recency ordering.
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Returns true if `now` is past the expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns true if the record is unused and unexpired at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }
}

/// Insert shape for a new record; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOtpRecord {
    pub identity: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewOtpRecord {
    /// Builds an insert whose expiry is `created_at + expires_in`.
    pub fn new(
        identity: impl Into<String>,
        code: impl Into<String>,
        purpose: OtpPurpose,
        created_at: DateTime<Utc>,
        expires_in: Duration,
    ) -> Self {
        Self {
            identity: identity.into(),
            code: code.into(),
            purpose,
            expires_at: created_at + expires_in,
            created_at,
        }
    }

    /// Materializes the record under the given id, unused.
    pub fn into_record(self, id: impl Into<String>) -> OtpRecord {
        OtpRecord {
            id: id.into(),
            identity: self.identity,
            code: self.code,
            purpose: self.purpose,
            expires_at: self.expires_at,
            is_used: false,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_round_trip_through_str() {
        for purpose in OtpPurpose::ALL {
            assert_eq!(purpose.as_str().parse::<OtpPurpose>().unwrap(), purpose);
        }
    }

    #[test]
    fn test_purpose_rejects_unknown_and_empty() {
        assert!(matches!(
            "sign-in".parse::<OtpPurpose>(),
            Err(AuthError::InvalidField { .. })
        ));
        assert!(matches!(
            "".parse::<OtpPurpose>(),
            Err(AuthError::MissingField { .. })
        ));
        // Tags are case-sensitive.
        assert!("password_reset".parse::<OtpPurpose>().is_err());
    }

    #[test]
    fn test_purpose_serde_tag() {
        let json = serde_json::to_string(&OtpPurpose::TwoFactorAuth).unwrap();
        assert_eq!(json, "\"TWO_FACTOR_AUTH\"");
    }

    #[test]
    fn test_new_record_expiry() {
        let now = Utc::now();
        let insert = NewOtpRecord::new(
            "alice@example.com",
            "123456",
            OtpPurpose::PasswordReset,
            now,
            Duration::minutes(10),
        );
        assert_eq!(insert.expires_at, now + Duration::minutes(10));

        let record = insert.into_record("otp_1");
        assert!(!record.is_used);
        assert!(record.is_live_at(now));
        assert!(!record.is_expired_at(now + Duration::minutes(10)));
        assert!(record.is_expired_at(now + Duration::minutes(10) + Duration::seconds(1)));
    }
}
