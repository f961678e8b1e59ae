//! NCF sequence ranges and the allocator that consumes them.

mod allocator;
mod domain;
mod store;

pub use allocator::{AllocationError, SequenceAllocator, UnavailableReason};
pub use domain::{
    FiscalNumber, InvalidFiscalNumber, SequenceConfigError, SequenceRange, SequenceRangeId,
    SequenceStatus, Series,
};
pub use store::{InMemorySequenceStore, SequenceStore, StoreError};
