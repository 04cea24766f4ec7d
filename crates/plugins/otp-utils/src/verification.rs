//! Verification utilities.

use carwash_auth_core::{AuthError, AuthResult, OtpRecord};
use chrono::{DateTime, Utc};

/// Result of checking a looked-up record against the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The code is valid.
    Verified {
        /// Whether the matched record was already marked used.
        was_already_used: bool,
    },
    /// No usable record matched. Covers both "wrong code" and "no such code".
    Invalid,
    /// A record matched but has expired.
    Expired,
}

impl VerificationOutcome {
    /// Decides the outcome for the newest record matching a submission.
    ///
    /// An already-used record counts as `Invalid` unless `tolerate_replay` is
    /// set, in which case it verifies again and reports `was_already_used`.
    pub fn evaluate(
        record: Option<&OtpRecord>,
        now: DateTime<Utc>,
        tolerate_replay: bool,
    ) -> Self {
        let Some(record) = record else {
            return Self::Invalid;
        };

        if record.is_used && !tolerate_replay {
            return Self::Invalid;
        }

        if record.is_expired_at(now) {
            return Self::Expired;
        }

        Self::Verified {
            was_already_used: record.is_used,
        }
    }

    /// Returns true if verification was successful.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Whether the matched record must be consumed (deleted or marked used).
    pub fn consumes_record(&self) -> bool {
        matches!(self, Self::Verified { .. } | Self::Expired)
    }

    /// Converts to a result carrying `was_already_used` on success.
    pub fn into_result(self) -> AuthResult<bool> {
        match self {
            Self::Verified { was_already_used } => Ok(was_already_used),
            Self::Invalid => Err(AuthError::InvalidOtp),
            Self::Expired => Err(AuthError::OtpExpired),
        }
    }
}
