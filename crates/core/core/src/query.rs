//! Filters, patches, and ordering used by `OtpStore` operations.

use chrono::{DateTime, Utc};

use crate::types::{OtpPurpose, OtpRecord};

/// Filter over OTP records.
///
/// Every set field must match (logical AND). Unset fields match anything, so
/// `OtpFilter::new()` selects every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpFilter {
    /// Exact record id.
    pub id: Option<String>,
    /// Exact identity, no case folding.
    pub identity: Option<String>,
    /// Exact stored code.
    pub code: Option<String>,
    /// Purpose tag.
    pub purpose: Option<OtpPurpose>,
    /// Used flag.
    pub is_used: Option<bool>,
    /// `created_at >= instant`.
    pub created_since: Option<DateTime<Utc>>,
    /// `created_at < instant`.
    pub created_before: Option<DateTime<Utc>>,
    /// `expires_at < instant`.
    pub expires_before: Option<DateTime<Utc>>,
    /// `expires_at >= instant`.
    pub expires_from: Option<DateTime<Utc>>,
}

impl OtpFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter selecting one record by id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().id(id)
    }

    /// Filter selecting every record for an identity and purpose.
    pub fn for_pair(identity: impl Into<String>, purpose: OtpPurpose) -> Self {
        Self::new().identity(identity).purpose(purpose)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn purpose(mut self, purpose: OtpPurpose) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn is_used(mut self, is_used: bool) -> Self {
        self.is_used = Some(is_used);
        self
    }

    pub fn created_since(mut self, instant: DateTime<Utc>) -> Self {
        self.created_since = Some(instant);
        self
    }

    pub fn created_before(mut self, instant: DateTime<Utc>) -> Self {
        self.created_before = Some(instant);
        self
    }

    pub fn expires_before(mut self, instant: DateTime<Utc>) -> Self {
        self.expires_before = Some(instant);
        self
    }

    pub fn expires_from(mut self, instant: DateTime<Utc>) -> Self {
        self.expires_from = Some(instant);
        self
    }

    /// Returns true if the record satisfies every set field.
    pub fn matches(&self, record: &OtpRecord) -> bool {
        if let Some(id) = &self.id {
            if &record.id != id {
                return false;
            }
        }

        if let Some(identity) = &self.identity {
            if &record.identity != identity {
                return false;
            }
        }

        if let Some(code) = &self.code {
            if &record.code != code {
                return false;
            }
        }

        if let Some(purpose) = self.purpose {
            if record.purpose != purpose {
                return false;
            }
        }

        if let Some(is_used) = self.is_used {
            if record.is_used != is_used {
                return false;
            }
        }

        if let Some(since) = self.created_since {
            if record.created_at < since {
                return false;
            }
        }

        if let Some(before) = self.created_before {
            if record.created_at >= before {
                return false;
            }
        }

        if let Some(before) = self.expires_before {
            if record.expires_at >= before {
                return false;
            }
        }

        if let Some(from) = self.expires_from {
            if record.expires_at < from {
                return false;
            }
        }

        true
    }
}

/// Field changes applied by `OtpStore::update_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OtpPatch {
    pub is_used: Option<bool>,
}

impl OtpPatch {
    /// Patch that marks records as used.
    pub fn mark_used() -> Self {
        Self {
            is_used: Some(true),
        }
    }

    /// Applies the patch to a record in place.
    pub fn apply(&self, record: &mut OtpRecord) {
        if let Some(is_used) = self.is_used {
            record.is_used = is_used;
        }
    }
}

/// Sort order for `OtpStore::find_first`, by `created_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordOrdering {
    /// Most recently created first.
    #[default]
    NewestFirst,

    /// Least recently created first.
    OldestFirst,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewOtpRecord;
    use chrono::Duration;

    fn record(now: DateTime<Utc>) -> OtpRecord {
        NewOtpRecord::new(
            "alice@example.com",
            "123456",
            OtpPurpose::PasswordReset,
            now,
            Duration::minutes(10),
        )
        .into_record("otp_1")
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(OtpFilter::new().matches(&record(Utc::now())));
    }

    #[test]
    fn test_exact_field_matching() {
        let now = Utc::now();
        let rec = record(now);

        assert!(OtpFilter::for_pair("alice@example.com", OtpPurpose::PasswordReset).matches(&rec));
        assert!(!OtpFilter::for_pair("Alice@example.com", OtpPurpose::PasswordReset).matches(&rec));
        assert!(!OtpFilter::for_pair("alice@example.com", OtpPurpose::TwoFactorAuth).matches(&rec));
        assert!(!OtpFilter::new().code("12345").matches(&rec));
        assert!(OtpFilter::by_id("otp_1").is_used(false).matches(&rec));
    }

    #[test]
    fn test_time_bounds() {
        let now = Utc::now();
        let rec = record(now);

        assert!(OtpFilter::new().created_since(now).matches(&rec));
        assert!(!OtpFilter::new().created_before(now).matches(&rec));
        assert!(OtpFilter::new().created_before(now + Duration::seconds(1)).matches(&rec));

        let expiry = now + Duration::minutes(10);
        assert!(!OtpFilter::new().expires_before(expiry).matches(&rec));
        assert!(OtpFilter::new().expires_before(expiry + Duration::seconds(1)).matches(&rec));
        assert!(OtpFilter::new().expires_from(expiry).matches(&rec));
    }

    #[test]
    fn test_patch_marks_used() {
        let mut rec = record(Utc::now());
        OtpPatch::default().apply(&mut rec);
        assert!(!rec.is_used);
        OtpPatch::mark_used().apply(&mut rec);
        assert!(rec.is_used);
    }
}
