//! # Carwash Auth Email OTP
//!
//! One-time codes for the marketplace's email flows: password reset, email
//! verification, and two-factor sign-in.
//!
//! The service issues codes under a per-identity rate limit, keeps at most one
//! live code per identity and purpose, verifies and consumes codes exactly
//! once, and sweeps expired or stale records. Storage is an injected
//! [`OtpStore`](carwash_auth_core::OtpStore); delivery is a caller-supplied
//! callback.
//!
//! ```rust,ignore
//! use carwash_auth_adapter_memory::MemoryOtpStore;
//! use carwash_auth_core::OtpPurpose;
//! use carwash_auth_email_otp::{EmailOtpConfig, EmailOtpService};
//! use std::sync::Arc;
//!
//! let service = EmailOtpService::new(Arc::new(MemoryOtpStore::new()), EmailOtpConfig::default())?;
//! let issued = service.issue("alice@example.com", OtpPurpose::PasswordReset).await;
//! let code = issued.code.unwrap();
//! let verified = service
//!     .verify("alice@example.com", &code, OtpPurpose::PasswordReset, true)
//!     .await;
//! assert!(verified.success);
//! ```

mod config;
mod message;
mod responses;
mod service;

pub use config::{
    EmailOtpConfig, EmailOtpData, MAX_EXPIRES_IN, MAX_RATE_LIMIT_WINDOW_DAYS, MAX_USED_RETENTION,
    OtpGeneratorFn, SendOtpCallback,
};
pub use message::OtpMessage;
pub use responses::{CleanupResponse, IssueResponse, OtpStats, SendOtpResponse, VerifyResponse};
pub use service::EmailOtpService;
