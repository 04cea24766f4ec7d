//! Structured results returned by the service.
//!
//! Every public operation answers with one of these instead of an error. A
//! `success: false` response always carries a caller-safe `error` message.

use carwash_auth_core::AuthError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ISSUE_FAILURE: &str = "Failed to generate OTP. Please try again.";
const VERIFY_FAILURE: &str = "Failed to verify OTP. Please try again.";
const CLEANUP_FAILURE: &str = "Failed to clean up OTP records.";

/// User errors keep their own message; anything internal collapses to `fallback`.
fn public_message(err: &AuthError, fallback: &str) -> String {
    if err.is_user_error() {
        err.to_string()
    } else {
        fallback.to_string()
    }
}

/// Response for issuing a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IssueResponse {
    pub fn issued(code: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            code: Some(code),
            expires_at: Some(expires_at),
            retry_after_minutes: None,
            error: None,
        }
    }

    pub fn failed(err: &AuthError) -> Self {
        Self {
            success: false,
            code: None,
            expires_at: None,
            retry_after_minutes: err.retry_after_minutes(),
            error: Some(public_message(err, ISSUE_FAILURE)),
        }
    }
}

/// Response for verifying a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_already_used: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyResponse {
    pub fn verified(was_already_used: bool) -> Self {
        Self {
            success: true,
            was_already_used: Some(was_already_used),
            error: None,
        }
    }

    pub fn failed(err: &AuthError) -> Self {
        Self {
            success: false,
            was_already_used: None,
            error: Some(public_message(err, VERIFY_FAILURE)),
        }
    }
}

/// Response for a cleanup sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub deleted_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CleanupResponse {
    pub fn completed(deleted_count: usize) -> Self {
        Self {
            success: true,
            deleted_count,
            error: None,
        }
    }

    pub fn failed(err: &AuthError) -> Self {
        Self {
            success: false,
            deleted_count: 0,
            error: Some(public_message(err, CLEANUP_FAILURE)),
        }
    }
}

/// Response for issuing a code and handing it to the sender.
///
/// The code itself is never echoed back; it only travels in the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub success: bool,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOtpResponse {
    pub fn sent(expires_at: DateTime<Utc>, delivered: bool) -> Self {
        Self {
            success: true,
            delivered,
            expires_at: Some(expires_at),
            retry_after_minutes: None,
            error: None,
        }
    }

    pub fn failed(err: &AuthError) -> Self {
        Self {
            success: false,
            delivered: false,
            expires_at: None,
            retry_after_minutes: err.retry_after_minutes(),
            error: Some(public_message(err, ISSUE_FAILURE)),
        }
    }
}

/// Point-in-time record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpStats {
    /// Every stored record.
    pub total: usize,
    /// Unused and unexpired.
    pub live: usize,
    /// Consumed or invalidated.
    pub used: usize,
    /// Past expiry, used or not.
    pub expired: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_failure_hides_store_details() {
        let response = IssueResponse::failed(&AuthError::database("connection refused"));
        assert_eq!(response.error.as_deref(), Some(ISSUE_FAILURE));
        assert!(!response.success);
    }

    #[test]
    fn test_rate_limited_issue_carries_wait_hint() {
        let response = IssueResponse::failed(&AuthError::RateLimitExceeded { wait_minutes: 42 });
        assert_eq!(response.retry_after_minutes, Some(42));
        assert_eq!(
            response.error.as_deref(),
            Some("Too many OTP requests. Please try again in 42 minutes.")
        );
    }

    #[test]
    fn test_verify_json_shape() {
        let ok = serde_json::to_value(VerifyResponse::verified(false)).unwrap();
        assert_eq!(ok, json!({ "success": true, "wasAlreadyUsed": false }));

        let failed = serde_json::to_value(VerifyResponse::failed(&AuthError::InvalidOtp)).unwrap();
        assert_eq!(
            failed,
            json!({ "success": false, "error": "Invalid or expired OTP." })
        );
    }

    #[test]
    fn test_cleanup_json_shape() {
        let value = serde_json::to_value(CleanupResponse::completed(3)).unwrap();
        assert_eq!(value, json!({ "success": true, "deletedCount": 3 }));
    }
}
