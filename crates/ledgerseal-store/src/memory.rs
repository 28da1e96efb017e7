//! In-memory implementation of the LedgerStore trait.
//!
//! This is primarily for testing. It has the same semantics as the
//! filesystem store but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use ledgerseal_core::{EntryId, SealedEntry};

use crate::error::Result;
use crate::subject::SubjectIndexRecord;
use crate::traits::{placement, AppendResult, LedgerStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records indexed by id.
    entries: BTreeMap<EntryId, SealedEntry>,

    /// Daily log: issuance day -> ids in append order.
    log: BTreeMap<NaiveDate, Vec<EntryId>>,

    /// Subject index keyed by subject_ref.
    subjects: HashMap<String, SubjectIndexRecord>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append(&self, entry: &SealedEntry) -> Result<AppendResult> {
        let day = placement(entry)?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.entries.contains_key(entry.entry_id()) {
            return Ok(AppendResult::Duplicate);
        }

        let entry_id = entry.entry_id().clone();
        inner.entries.insert(entry_id.clone(), entry.clone());
        inner.log.entry(day).or_default().push(entry_id.clone());
        inner
            .subjects
            .entry(entry.subject_ref().to_string())
            .or_insert_with(|| SubjectIndexRecord::new(entry.subject_ref()))
            .insert(&entry_id);

        Ok(AppendResult::Committed)
    }

    async fn get(&self, entry_id: &EntryId) -> Result<Option<SealedEntry>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.entries.get(entry_id).cloned())
    }

    async fn lookup_by_subject_ref(&self, subject_ref: &str) -> Result<Vec<EntryId>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .subjects
            .get(subject_ref)
            .map(|record| record.entry_ids.clone())
            .unwrap_or_default())
    }

    async fn contains(&self, entry_id: &EntryId) -> Result<bool> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.entries.contains_key(entry_id))
    }

    async fn entries_for_day(&self, day: NaiveDate) -> Result<Vec<SealedEntry>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .log
            .get(&day)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect())
    }

    async fn entry_ids(&self) -> Result<Vec<EntryId>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.entries.keys().cloned().collect())
    }

    async fn count(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.entries.len() as u64)
    }
}
