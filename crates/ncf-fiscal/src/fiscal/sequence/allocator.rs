use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use super::domain::{FiscalNumber, SequenceRange, SequenceRangeId, SequenceStatus};
use super::store::{SequenceStore, StoreError};
use crate::fiscal::catalog::TypeCode;
use crate::fiscal::document::CompanyId;

/// CAS retries before giving up with `AllocationConflict`. Contention on a
/// single range is rare (two POS terminals closing orders at once), so a
/// small budget suffices; callers may retry the whole bind.
const MAX_ALLOCATION_ATTEMPTS: usize = 5;

/// Hands out NCF numbers from the active range of a (type, company) pair.
///
/// All date-sensitive decisions take `today` explicitly; the allocator never
/// consults a clock of its own.
pub struct SequenceAllocator<S> {
    store: Arc<S>,
}

impl<S> Clone for SequenceAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SequenceStore> SequenceAllocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Selects the usable range for a document type and company as of a
    /// date. With overlapping active ranges (a configuration error the
    /// allocator tolerates) the latest `valid_from` wins, tie-broken by the
    /// most recent registration.
    pub fn find_active_range(
        &self,
        document_type: &TypeCode,
        company: &CompanyId,
        as_of: NaiveDate,
    ) -> Result<SequenceRange, AllocationError> {
        let mut candidates: Vec<SequenceRange> = self
            .store
            .ranges_for(document_type, company)?
            .into_iter()
            .filter(|range| {
                range.enabled
                    && range.valid_from <= as_of
                    && as_of <= range.valid_until
                    && range.status(as_of) == SequenceStatus::Active
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.valid_from
                .cmp(&a.valid_from)
                .then(b.created_seq.cmp(&a.created_seq))
        });
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| AllocationError::NoActiveSequence {
                document_type: document_type.clone(),
                company: company.clone(),
            })
    }

    /// Issues the next number from a range.
    ///
    /// Status is re-validated and the post-increment value re-checked
    /// against `range_end` on every attempt, so a range that becomes
    /// exhausted between the read and the write fails with
    /// `SequenceExhausted` instead of over-issuing.
    pub fn allocate(
        &self,
        id: &SequenceRangeId,
        today: NaiveDate,
    ) -> Result<FiscalNumber, AllocationError> {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let range = self
                .store
                .fetch(id)?
                .ok_or(AllocationError::Store(StoreError::NotFound))?;

            match range.status(today) {
                SequenceStatus::Disabled => {
                    return Err(AllocationError::SequenceUnavailable {
                        sequence: range.display_label(),
                        reason: UnavailableReason::Disabled,
                    })
                }
                SequenceStatus::Expired => {
                    return Err(AllocationError::SequenceUnavailable {
                        sequence: range.display_label(),
                        reason: UnavailableReason::Expired {
                            valid_until: range.valid_until,
                        },
                    })
                }
                SequenceStatus::Exhausted => {
                    return Err(AllocationError::SequenceExhausted {
                        sequence: range.display_label(),
                    })
                }
                SequenceStatus::Active => {}
            }

            let next = range.next_number();
            if next > range.range_end {
                return Err(AllocationError::SequenceExhausted {
                    sequence: range.display_label(),
                });
            }

            match self.store.compare_and_advance(id, range.cursor, next) {
                Ok(()) => {
                    return Ok(FiscalNumber::compose(
                        range.series,
                        &range.document_type,
                        next,
                    ))
                }
                Err(StoreError::CursorConflict) => {
                    debug!(attempt, sequence = %range.display_label(), "cursor moved, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(AllocationError::AllocationConflict {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }

    /// What the next allocation would return, without consuming it.
    pub fn preview(&self, range: &SequenceRange) -> FiscalNumber {
        FiscalNumber::compose(range.series, &range.document_type, range.next_number())
    }

    /// Low-stock and near-expiry warnings for one range, newline-joined.
    pub fn alert_message(&self, range: &SequenceRange, today: NaiveDate) -> Option<String> {
        let lines = range.alert_lines(today);
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Every alert across the company's enabled ranges, for dashboards.
    pub fn alerts_for_company(
        &self,
        company: &CompanyId,
        today: NaiveDate,
    ) -> Result<Vec<String>, AllocationError> {
        let mut alerts = Vec::new();
        for range in self.store.company_ranges(company)? {
            if let Some(message) = self.alert_message(&range, today) {
                alerts.push(message);
            }
        }
        Ok(alerts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    Disabled,
    Expired { valid_until: NaiveDate },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("the sequence is disabled"),
            Self::Expired { valid_until } => {
                write!(f, "the sequence expired on {valid_until}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("no active NCF sequence configured for document type {document_type} in company {company}")]
    NoActiveSequence {
        document_type: TypeCode,
        company: CompanyId,
    },
    #[error("NCF sequence {sequence} is not usable: {reason}")]
    SequenceUnavailable {
        sequence: String,
        reason: UnavailableReason,
    },
    #[error("NCF sequence {sequence} is exhausted; register a new authorized range")]
    SequenceExhausted { sequence: String },
    #[error("allocation contention persisted after {attempts} attempts; retry the operation")]
    AllocationConflict { attempts: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}
