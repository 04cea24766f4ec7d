//! # Carwash Auth Memory Adapter
//!
//! An in-memory `OtpStore`, primarily intended for testing, development, and
//! single-node deployments.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carwash_auth_adapter_memory::MemoryOtpStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryOtpStore::new());
//! let service = EmailOtpService::new(store, EmailOtpConfig::default())?;
//! ```

use async_trait::async_trait;
use carwash_auth_core::error::{AuthError, AuthResult};
use carwash_auth_core::query::{OtpFilter, OtpPatch, RecordOrdering};
use carwash_auth_core::traits::OtpStore;
use carwash_auth_core::types::{NewOtpRecord, OtpRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A stored record plus its insertion sequence, used to break `created_at` ties.
#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: OtpRecord,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Entry>,
    next_seq: u64,
}

impl Inner {
    fn insert(&mut self, record: NewOtpRecord) -> OtpRecord {
        let record = record.into_record(uuid::Uuid::new_v4().to_string());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(
            record.id.clone(),
            Entry {
                seq,
                record: record.clone(),
            },
        );
        record
    }

    fn update_matching(&mut self, filter: &OtpFilter, patch: OtpPatch) -> usize {
        let mut changed = 0;
        for entry in self.records.values_mut() {
            if filter.matches(&entry.record) {
                patch.apply(&mut entry.record);
                changed += 1;
            }
        }
        changed
    }
}

/// In-memory OTP store.
///
/// All state sits behind one async `RwLock`, so each operation (including
/// `replace_live`) is atomic with respect to the others. Data is lost when the
/// process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryOtpStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryOtpStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all stored records.
    pub async fn clear(&self) {
        self.inner.write().await.records.clear();
    }

    /// Returns the number of records stored.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Returns true if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Returns a copy of every record, oldest first.
    pub async fn snapshot(&self) -> Vec<OtpRecord> {
        let inner = self.inner.read().await;
        let mut entries: Vec<&Entry> = inner.records.values().collect();
        entries.sort_by_key(|e| (e.record.created_at, e.seq));
        entries.into_iter().map(|e| e.record.clone()).collect()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn create(&self, record: NewOtpRecord) -> AuthResult<OtpRecord> {
        let mut inner = self.inner.write().await;
        Ok(inner.insert(record))
    }

    async fn find_first(
        &self,
        filter: &OtpFilter,
        ordering: RecordOrdering,
    ) -> AuthResult<Option<OtpRecord>> {
        let inner = self.inner.read().await;
        let matching = inner.records.values().filter(|e| filter.matches(&e.record));

        let found = match ordering {
            RecordOrdering::NewestFirst => matching.max_by_key(|e| (e.record.created_at, e.seq)),
            RecordOrdering::OldestFirst => matching.min_by_key(|e| (e.record.created_at, e.seq)),
        };

        Ok(found.map(|e| e.record.clone()))
    }

    async fn count(&self, filter: &OtpFilter) -> AuthResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|e| filter.matches(&e.record))
            .count())
    }

    async fn update_many(&self, filter: &OtpFilter, patch: OtpPatch) -> AuthResult<usize> {
        let mut inner = self.inner.write().await;
        Ok(inner.update_matching(filter, patch))
    }

    async fn delete(&self, id: &str) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        match inner.records.remove(id) {
            Some(_) => Ok(()),
            None => Err(AuthError::not_found("otp", "id", id)),
        }
    }

    async fn delete_many(&self, filter: &OtpFilter) -> AuthResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|_, e| !filter.matches(&e.record));
        Ok(before - inner.records.len())
    }

    async fn replace_live(&self, record: NewOtpRecord) -> AuthResult<OtpRecord> {
        // Both steps under one write guard: no reader sees two live codes.
        let mut inner = self.inner.write().await;
        let live = OtpFilter::for_pair(record.identity.clone(), record.purpose).is_used(false);
        inner.update_matching(&live, OtpPatch::mark_used());
        Ok(inner.insert(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carwash_auth_core::OtpPurpose;
    use chrono::{Duration, Utc};

    fn insert(code: &str) -> NewOtpRecord {
        NewOtpRecord::new(
            "alice@example.com",
            code,
            OtpPurpose::PasswordReset,
            Utc::now(),
            Duration::minutes(10),
        )
    }

    #[tokio::test]
    async fn test_create_assigns_unique_ids() {
        let store = MemoryOtpStore::new();

        let a = store.create(insert("111111")).await.unwrap();
        let b = store.create(insert("111111")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(!a.is_used);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_first_breaks_ties_by_insertion() {
        let store = MemoryOtpStore::new();
        let now = Utc::now();
        let same_instant = |code: &str| {
            NewOtpRecord::new(
                "alice@example.com",
                code,
                OtpPurpose::PasswordReset,
                now,
                Duration::minutes(10),
            )
        };

        let first = store.create(same_instant("123456")).await.unwrap();
        let second = store.create(same_instant("123456")).await.unwrap();

        let filter = OtpFilter::new().code("123456");
        let newest = store
            .find_first(&filter, RecordOrdering::NewestFirst)
            .await
            .unwrap()
            .unwrap();
        let oldest = store
            .find_first(&filter, RecordOrdering::OldestFirst)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(newest.id, second.id);
        assert_eq!(oldest.id, first.id);
    }

    #[tokio::test]
    async fn test_update_and_delete_many() {
        let store = MemoryOtpStore::new();
        let a = store.create(insert("111111")).await.unwrap();
        store.create(insert("222222")).await.unwrap();

        let changed = store
            .update_many(&OtpFilter::by_id(&a.id), OtpPatch::mark_used())
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(store.count(&OtpFilter::new().is_used(true)).await.unwrap(), 1);

        let removed = store
            .delete_many(&OtpFilter::new().is_used(true))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_found() {
        let store = MemoryOtpStore::new();
        let result = store.delete("missing").await;
        assert!(matches!(result, Err(AuthError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_replace_live_is_atomic_under_concurrency() {
        let store = MemoryOtpStore::new();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .replace_live(insert(&format!("{:06}", 100000 + i)))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let live =
            OtpFilter::for_pair("alice@example.com", OtpPurpose::PasswordReset).is_used(false);
        assert_eq!(store.count(&live).await.unwrap(), 1);
        assert_eq!(store.len().await, 16);
    }

    #[tokio::test]
    async fn test_snapshot_and_clear() {
        let store = MemoryOtpStore::new();
        store.create(insert("111111")).await.unwrap();
        assert_eq!(store.snapshot().await.len(), 1);

        store.clear().await;
        assert!(store.is_empty().await);
    }
}
