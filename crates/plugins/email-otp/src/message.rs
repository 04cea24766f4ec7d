//! Notification text handed to the sender callback.

use carwash_auth_core::OtpPurpose;
use serde::Serialize;

/// A rendered OTP notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpMessage {
    pub subject: String,
    pub text: String,
}

impl OtpMessage {
    /// Renders the subject and plain-text body for a purpose.
    pub fn render(app_name: &str, purpose: OtpPurpose, code: &str, valid_minutes: u64) -> Self {
        let (subject, action) = match purpose {
            OtpPurpose::PasswordReset => ("Password reset code", "reset your password"),
            OtpPurpose::EmailVerification => ("Verify your email", "verify your email address"),
            OtpPurpose::TwoFactorAuth => ("Your sign-in code", "finish signing in"),
        };

        let text = format!(
            "Use the code {code} to {action} on {app_name}.\n\
             The code expires in {valid_minutes} minutes and can be used once.\n\
             If you did not request this, you can ignore this email."
        );

        Self {
            subject: format!("{app_name}: {subject}"),
            text,
        }
    }
}
