//! # Carwash Auth Core
//!
//! This crate provides the foundational types and traits for the marketplace's
//! one-time password subsystem. It defines the persisted `OtpRecord`, the
//! `OtpPurpose` tags, the error type, the `OtpStore` interface that storage
//! adapters implement, and the `Clock` abstraction services read time from.

pub mod clock;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, AuthResult};
pub use query::{OtpFilter, OtpPatch, RecordOrdering};
pub use traits::OtpStore;
pub use types::{NewOtpRecord, OtpPurpose, OtpRecord};
