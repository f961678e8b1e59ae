use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::catalog::{DocumentTypeCatalog, TypeCode};
use super::document::{BusinessDocument, CompanyId, DocumentId, DocumentState};
use super::sequence::{
    AllocationError, FiscalNumber, InvalidFiscalNumber, SequenceAllocator, SequenceRangeId,
    SequenceStore, StoreError,
};

/// Storage abstraction for business documents.
///
/// `bind` must apply the number, the consumed-range reference, and nothing
/// else as one atomic update, and must reject a number that another
/// non-voided document in the same company already holds.
pub trait DocumentStore: Send + Sync {
    fn insert(&self, document: BusinessDocument) -> Result<BusinessDocument, StoreError>;
    fn fetch(&self, id: &DocumentId) -> Result<Option<BusinessDocument>, StoreError>;
    fn find_by_number(
        &self,
        company: &CompanyId,
        number: &FiscalNumber,
    ) -> Result<Option<BusinessDocument>, StoreError>;
    fn in_period(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BusinessDocument>, StoreError>;
    fn bind(
        &self,
        id: &DocumentId,
        number: FiscalNumber,
        range: SequenceRangeId,
    ) -> Result<(), StoreError>;
    fn set_modified_number(
        &self,
        id: &DocumentId,
        number: FiscalNumber,
    ) -> Result<(), StoreError>;
    fn set_state(
        &self,
        id: &DocumentId,
        state: DocumentState,
        voided_on: Option<NaiveDate>,
        void_reason: Option<String>,
    ) -> Result<(), StoreError>;
}

/// Mutex-backed store for tests, demos, and the bundled HTTP service.
#[derive(Default, Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<DocumentId, BusinessDocument>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert(&self, document: BusinessDocument) -> Result<BusinessDocument, StoreError> {
        let mut guard = self.documents.lock().expect("document store mutex poisoned");
        if guard.contains_key(&document.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    fn fetch(&self, id: &DocumentId) -> Result<Option<BusinessDocument>, StoreError> {
        let guard = self.documents.lock().expect("document store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_number(
        &self,
        company: &CompanyId,
        number: &FiscalNumber,
    ) -> Result<Option<BusinessDocument>, StoreError> {
        let guard = self.documents.lock().expect("document store mutex poisoned");
        Ok(guard
            .values()
            .find(|document| {
                &document.company == company
                    && document.state != DocumentState::Voided
                    && document.fiscal_number.as_ref() == Some(number)
            })
            .cloned())
    }

    fn in_period(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BusinessDocument>, StoreError> {
        let guard = self.documents.lock().expect("document store mutex poisoned");
        Ok(guard
            .values()
            .filter(|document| {
                &document.company == company
                    && document.issue_date >= from
                    && document.issue_date <= to
            })
            .cloned()
            .collect())
    }

    fn bind(
        &self,
        id: &DocumentId,
        number: FiscalNumber,
        range: SequenceRangeId,
    ) -> Result<(), StoreError> {
        let mut guard = self.documents.lock().expect("document store mutex poisoned");
        let company = guard
            .get(id)
            .map(|document| document.company.clone())
            .ok_or(StoreError::NotFound)?;
        let taken = guard.values().any(|document| {
            document.company == company
                && document.id != *id
                && document.state != DocumentState::Voided
                && document.fiscal_number.as_ref() == Some(&number)
        });
        if taken {
            return Err(StoreError::Conflict);
        }
        // Both fields land under the same lock; partial state is never
        // observable.
        let document = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        document.fiscal_number = Some(number);
        document.consumed_range = Some(range);
        Ok(())
    }

    fn set_modified_number(
        &self,
        id: &DocumentId,
        number: FiscalNumber,
    ) -> Result<(), StoreError> {
        let mut guard = self.documents.lock().expect("document store mutex poisoned");
        let document = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        document.modified_fiscal_number = Some(number);
        Ok(())
    }

    fn set_state(
        &self,
        id: &DocumentId,
        state: DocumentState,
        voided_on: Option<NaiveDate>,
        void_reason: Option<String>,
    ) -> Result<(), StoreError> {
        let mut guard = self.documents.lock().expect("document store mutex poisoned");
        let document = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        document.state = state;
        document.voided_on = voided_on;
        document.void_reason = void_reason;
        Ok(())
    }
}

/// Non-consuming view of the next NCF a document would receive.
#[derive(Debug, Clone, Serialize)]
pub struct NcfPreview {
    pub number: FiscalNumber,
    pub sequence: String,
    pub available: u32,
}

/// Binds allocated NCF numbers to business documents at the post
/// transition, exactly once each.
pub struct DocumentBinder<S, D> {
    catalog: Arc<DocumentTypeCatalog>,
    allocator: SequenceAllocator<S>,
    documents: Arc<D>,
}

impl<S, D> DocumentBinder<S, D>
where
    S: SequenceStore,
    D: DocumentStore,
{
    pub fn new(
        catalog: Arc<DocumentTypeCatalog>,
        allocator: SequenceAllocator<S>,
        documents: Arc<D>,
    ) -> Self {
        Self {
            catalog,
            allocator,
            documents,
        }
    }

    pub fn allocator(&self) -> &SequenceAllocator<S> {
        &self.allocator
    }

    pub fn documents(&self) -> &Arc<D> {
        &self.documents
    }

    pub fn catalog(&self) -> &DocumentTypeCatalog {
        &self.catalog
    }

    /// All checks a document must pass before a number is consumed: a
    /// document type is selected, the counterparty carries a tax id when
    /// the type demands one, and an active range exists. Runs entirely
    /// before allocation so a failure never wastes a cursor value.
    pub fn validate_before_bind(
        &self,
        document: &BusinessDocument,
        today: NaiveDate,
    ) -> Result<(), BindError> {
        let code = document
            .document_type
            .as_ref()
            .ok_or(BindError::MissingDocumentType)?;
        let document_type = self
            .catalog
            .get(code)
            .ok_or_else(|| BindError::UnknownDocumentType(code.clone()))?;
        if document_type.requires_tax_id && !document.counterparty.has_tax_id() {
            return Err(BindError::MissingTaxId {
                document_type: code.clone(),
            });
        }
        if document_type.is_fiscal {
            self.allocator
                .find_active_range(code, &document.company, today)?;
        }
        Ok(())
    }

    /// Allocates and writes an NCF onto the document. Idempotent: a
    /// document that already carries a number is left untouched, and
    /// non-fiscal types never receive one.
    pub fn assign_number(
        &self,
        id: &DocumentId,
        today: NaiveDate,
    ) -> Result<BusinessDocument, BindError> {
        let document = self.fetch_document(id)?;

        if let Some(number) = &document.fiscal_number {
            info!(document = %document.id, number = %number, "document already carries an NCF, skipping allocation");
            return Ok(document);
        }

        let code = document
            .document_type
            .clone()
            .ok_or(BindError::MissingDocumentType)?;
        let document_type = self
            .catalog
            .get(&code)
            .ok_or_else(|| BindError::UnknownDocumentType(code.clone()))?;
        if !document_type.is_fiscal {
            return Ok(document);
        }

        self.validate_before_bind(&document, today)?;

        let range = self
            .allocator
            .find_active_range(&code, &document.company, today)?;
        let number = self.allocator.allocate(&range.id, today)?;

        // Integrity check. Unreachable with a correct allocator, but a
        // duplicate here means the numbering history is corrupt and must
        // surface rather than overwrite.
        if self
            .documents
            .find_by_number(&document.company, &number)?
            .is_some()
        {
            return Err(BindError::DuplicateNumber { number });
        }

        match self.documents.bind(id, number.clone(), range.id.clone()) {
            Ok(()) => {}
            Err(StoreError::Conflict) => return Err(BindError::DuplicateNumber { number }),
            Err(other) => return Err(other.into()),
        }
        info!(document = %id, number = %number, sequence = %range.display_label(), "NCF assigned");

        self.fetch_document(id)
    }

    /// Post transition: validates and numbers sale documents, then marks
    /// the document posted.
    pub fn post_document(
        &self,
        id: &DocumentId,
        today: NaiveDate,
    ) -> Result<BusinessDocument, BindError> {
        let document = self.fetch_document(id)?;
        if document.state != DocumentState::Draft {
            return Err(BindError::NotDraft(id.clone()));
        }

        if document.kind.is_sale() {
            self.assign_number(id, today)?;
        }

        self.documents
            .set_state(id, DocumentState::Posted, None, None)?;
        self.fetch_document(id)
    }

    /// Voids a posted document. The NCF stays on the record: numbers are
    /// never recycled, even on void.
    pub fn void_document(
        &self,
        id: &DocumentId,
        today: NaiveDate,
        reason: Option<String>,
    ) -> Result<BusinessDocument, BindError> {
        let document = self.fetch_document(id)?;
        if document.state != DocumentState::Posted {
            return Err(BindError::NotPosted(id.clone()));
        }
        self.documents
            .set_state(id, DocumentState::Voided, Some(today), reason)?;
        self.fetch_document(id)
    }

    pub fn reinstate_document(&self, id: &DocumentId) -> Result<BusinessDocument, BindError> {
        let document = self.fetch_document(id)?;
        if document.state != DocumentState::Voided {
            return Err(BindError::NotVoided(id.clone()));
        }
        self.documents
            .set_state(id, DocumentState::Posted, None, None)?;
        self.fetch_document(id)
    }

    /// Live preview for confirmation screens. `None` when the document is
    /// untyped or its type is not fiscal.
    pub fn preview_next(
        &self,
        id: &DocumentId,
        today: NaiveDate,
    ) -> Result<Option<NcfPreview>, BindError> {
        let document = self.fetch_document(id)?;
        let Some(code) = &document.document_type else {
            return Ok(None);
        };
        let document_type = self
            .catalog
            .get(code)
            .ok_or_else(|| BindError::UnknownDocumentType(code.clone()))?;
        if !document_type.is_fiscal {
            return Ok(None);
        }
        let range = self
            .allocator
            .find_active_range(code, &document.company, today)?;
        Ok(Some(NcfPreview {
            number: self.allocator.preview(&range),
            sequence: range.display_label(),
            available: range.available(),
        }))
    }

    /// Records the NCF a credit or debit note amends, validating the
    /// structural pattern before the write.
    pub fn reference_modified_number(&self, id: &DocumentId, raw: &str) -> Result<(), BindError> {
        let number = FiscalNumber::parse(raw)?;
        self.documents.set_modified_number(id, number)?;
        Ok(())
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<BusinessDocument, BindError> {
        self.documents
            .fetch(id)?
            .ok_or_else(|| BindError::DocumentNotFound(id.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("document {0} was not found")]
    DocumentNotFound(DocumentId),
    #[error("a fiscal document type must be selected before posting")]
    MissingDocumentType,
    #[error("document type {0} is not registered in the catalog")]
    UnknownDocumentType(TypeCode),
    #[error("document type {document_type} requires the counterparty to carry an RNC or Cedula")]
    MissingTaxId { document_type: TypeCode },
    #[error("NCF {number} is already assigned to another document")]
    DuplicateNumber { number: FiscalNumber },
    #[error("document {0} is not a draft")]
    NotDraft(DocumentId),
    #[error("document {0} is not posted")]
    NotPosted(DocumentId),
    #[error("document {0} is not voided")]
    NotVoided(DocumentId),
    #[error(transparent)]
    InvalidFormat(#[from] InvalidFiscalNumber),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
