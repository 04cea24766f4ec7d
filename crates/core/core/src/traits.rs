//! Core traits for the OTP subsystem.
//!
//! This module defines the storage interface that adapters implement. Services
//! receive the store as an injected `Arc<dyn OtpStore>` handle rather than
//! reaching for a process-wide client.

use async_trait::async_trait;

use crate::error::AuthResult;
use crate::query::{OtpFilter, OtpPatch, RecordOrdering};
use crate::types::{NewOtpRecord, OtpRecord};

/// Trait for OTP storage adapters (database backends).
///
/// Every method is a single round trip. Individual writes are expected to be
/// serialized by the backend; no in-process locking is layered on top.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Inserts a record, assigning its id.
    async fn create(&self, record: NewOtpRecord) -> AuthResult<OtpRecord>;

    /// Returns the first record matching the filter under the given ordering.
    async fn find_first(
        &self,
        filter: &OtpFilter,
        ordering: RecordOrdering,
    ) -> AuthResult<Option<OtpRecord>>;

    /// Counts records matching the filter.
    async fn count(&self, filter: &OtpFilter) -> AuthResult<usize>;

    /// Applies a patch to every matching record, returning how many changed.
    async fn update_many(&self, filter: &OtpFilter, patch: OtpPatch) -> AuthResult<usize>;

    /// Deletes a record by id.
    async fn delete(&self, id: &str) -> AuthResult<()>;

    /// Deletes every matching record, returning how many were removed.
    async fn delete_many(&self, filter: &OtpFilter) -> AuthResult<usize>;

    /// Invalidates every unused record for the insert's identity and purpose,
    /// then inserts it.
    ///
    /// The default runs two independent statements, so concurrent callers can
    /// briefly leave two live codes. Adapters that can make the swap atomic
    /// should override this.
    async fn replace_live(&self, record: NewOtpRecord) -> AuthResult<OtpRecord> {
        let live = OtpFilter::for_pair(record.identity.clone(), record.purpose).is_used(false);
        self.update_many(&live, OtpPatch::mark_used()).await?;
        self.create(record).await
    }
}
