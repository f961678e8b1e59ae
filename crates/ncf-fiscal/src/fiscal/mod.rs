//! Fiscal domain: document type catalog, NCF sequence allocation, number
//! binding, and DGII 606/607 report extraction.

pub mod binder;
pub mod catalog;
pub mod document;
pub mod report;
pub mod sequence;

pub use binder::{BindError, DocumentBinder, DocumentStore, InMemoryDocumentStore, NcfPreview};
pub use catalog::{CatalogError, DocumentType, DocumentTypeCatalog, TypeCode};
pub use document::{
    BusinessDocument, CompanyId, Counterparty, DocumentId, DocumentKind, DocumentState, TaxIdKind,
};
pub use report::{ReportError, ReportExtractor, ReportKind, ReportRow};
pub use sequence::{
    AllocationError, FiscalNumber, InMemorySequenceStore, InvalidFiscalNumber, SequenceAllocator,
    SequenceConfigError, SequenceRange, SequenceRangeId, SequenceStatus, SequenceStore, Series,
    StoreError, UnavailableReason,
};
