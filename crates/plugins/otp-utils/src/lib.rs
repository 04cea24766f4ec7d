//! # Carwash Auth OTP Utilities
//!
//! Shared primitives for one-time password flows. This crate provides:
//! - Numeric code generation from the OS CSPRNG
//! - Store-backed sliding-window rate limiting
//! - Code storage at rest (plain or keyed hash)
//! - Verification outcome evaluation

mod generator;
mod rate_limit;
mod storage;
mod verification;

pub use generator::{MAX_OTP_LENGTH, OtpConfig, OtpGenerator};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter, wait_minutes};
pub use storage::{CodeStorage, CodeStorageMode};
pub use verification::VerificationOutcome;
