use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::domain::{SequenceRange, SequenceRangeId};
use crate::fiscal::catalog::TypeCode;
use crate::fiscal::document::CompanyId;

/// Storage abstraction for sequence ranges.
///
/// `compare_and_advance` is the one primitive the allocator relies on for
/// correctness under concurrency: the cursor write only lands if nobody
/// else advanced it since the caller's read.
pub trait SequenceStore: Send + Sync {
    fn insert(&self, range: SequenceRange) -> Result<SequenceRange, StoreError>;
    fn fetch(&self, id: &SequenceRangeId) -> Result<Option<SequenceRange>, StoreError>;
    fn ranges_for(
        &self,
        document_type: &TypeCode,
        company: &CompanyId,
    ) -> Result<Vec<SequenceRange>, StoreError>;
    fn company_ranges(&self, company: &CompanyId) -> Result<Vec<SequenceRange>, StoreError>;
    fn compare_and_advance(
        &self,
        id: &SequenceRangeId,
        expected: u32,
        next: u32,
    ) -> Result<(), StoreError>;
    fn set_enabled(&self, id: &SequenceRangeId, enabled: bool) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("cursor was advanced concurrently")]
    CursorConflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-backed store for tests, demos, and the bundled HTTP service.
#[derive(Default, Clone)]
pub struct InMemorySequenceStore {
    ranges: Arc<Mutex<HashMap<SequenceRangeId, SequenceRange>>>,
    registrations: Arc<AtomicU64>,
}

impl SequenceStore for InMemorySequenceStore {
    fn insert(&self, mut range: SequenceRange) -> Result<SequenceRange, StoreError> {
        let mut guard = self.ranges.lock().expect("sequence store mutex poisoned");
        if guard.contains_key(&range.id) {
            return Err(StoreError::Conflict);
        }
        range.created_seq = self.registrations.fetch_add(1, Ordering::Relaxed);
        guard.insert(range.id.clone(), range.clone());
        Ok(range)
    }

    fn fetch(&self, id: &SequenceRangeId) -> Result<Option<SequenceRange>, StoreError> {
        let guard = self.ranges.lock().expect("sequence store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn ranges_for(
        &self,
        document_type: &TypeCode,
        company: &CompanyId,
    ) -> Result<Vec<SequenceRange>, StoreError> {
        let guard = self.ranges.lock().expect("sequence store mutex poisoned");
        Ok(guard
            .values()
            .filter(|range| &range.document_type == document_type && &range.company == company)
            .cloned()
            .collect())
    }

    fn company_ranges(&self, company: &CompanyId) -> Result<Vec<SequenceRange>, StoreError> {
        let guard = self.ranges.lock().expect("sequence store mutex poisoned");
        Ok(guard
            .values()
            .filter(|range| &range.company == company)
            .cloned()
            .collect())
    }

    fn compare_and_advance(
        &self,
        id: &SequenceRangeId,
        expected: u32,
        next: u32,
    ) -> Result<(), StoreError> {
        let mut guard = self.ranges.lock().expect("sequence store mutex poisoned");
        let range = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if range.cursor != expected {
            return Err(StoreError::CursorConflict);
        }
        range.cursor = next;
        Ok(())
    }

    fn set_enabled(&self, id: &SequenceRangeId, enabled: bool) -> Result<(), StoreError> {
        let mut guard = self.ranges.lock().expect("sequence store mutex poisoned");
        let range = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        range.enabled = enabled;
        Ok(())
    }
}
