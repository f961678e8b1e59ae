//! DGII 606 (sales) and 607 (purchases) report extraction.

mod encoding;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use encoding::{
    tabular_file_name, text_file_name, write_fixed_width, write_tabular, PURCHASE_HEADERS,
    PURCHASE_ROW_LEN, SALES_HEADERS, SALES_ROW_LEN,
};

use super::binder::DocumentStore;
use super::catalog::DocumentTypeCatalog;
use super::document::{BusinessDocument, CompanyId, DocumentState, TaxIdKind};
use super::sequence::StoreError;

/// Default payment-method code in both filings (cash).
const PAYMENT_METHOD_CASH: &str = "01";
/// Default goods/services class in the 607 (expenses).
const GOODS_CLASS_EXPENSES: &str = "01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Sales,
    Purchases,
}

impl ReportKind {
    /// DGII form number.
    pub const fn number(self) -> &'static str {
        match self {
            Self::Sales => "606",
            Self::Purchases => "607",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.number())
    }
}

/// One filing line, already projected out of a document. Amounts stay in
/// integer cents until an encoder renders them.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub tax_id: String,
    pub tax_id_flag: &'static str,
    pub fiscal_number: String,
    pub modified_fiscal_number: String,
    pub document_type: String,
    pub goods_class: &'static str,
    pub issue_date: NaiveDate,
    /// Due date in the 606, payment date in the 607.
    pub secondary_date: NaiveDate,
    pub invoiced_cents: i64,
    pub tax_cents: i64,
    pub payment_method: &'static str,
}

impl ReportRow {
    fn from_sale(document: &BusinessDocument) -> Self {
        Self {
            tax_id: document.counterparty.tax_id.clone().unwrap_or_default(),
            tax_id_flag: id_flag(document.counterparty.tax_id_kind),
            fiscal_number: document
                .fiscal_number
                .as_ref()
                .map(|number| number.as_str().to_owned())
                .unwrap_or_default(),
            modified_fiscal_number: document
                .modified_fiscal_number
                .as_ref()
                .map(|number| number.as_str().to_owned())
                .unwrap_or_default(),
            document_type: document
                .document_type
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            goods_class: GOODS_CLASS_EXPENSES,
            issue_date: document.issue_date,
            secondary_date: document.due_date.unwrap_or(document.issue_date),
            invoiced_cents: document.total_cents(),
            tax_cents: document.tax_cents,
            payment_method: PAYMENT_METHOD_CASH,
        }
    }

    fn from_purchase(document: &BusinessDocument) -> Self {
        // Purchases report the supplier's comprobante with the fixed type
        // and goods-class defaults the filing expects.
        Self {
            tax_id: document.counterparty.tax_id.clone().unwrap_or_default(),
            tax_id_flag: id_flag(document.counterparty.tax_id_kind),
            fiscal_number: document
                .fiscal_number
                .as_ref()
                .map(|number| number.as_str().to_owned())
                .unwrap_or_default(),
            modified_fiscal_number: String::new(),
            document_type: "01".to_owned(),
            goods_class: GOODS_CLASS_EXPENSES,
            issue_date: document.issue_date,
            secondary_date: document.issue_date,
            invoiced_cents: document.total_cents(),
            tax_cents: document.tax_cents,
            payment_method: PAYMENT_METHOD_CASH,
        }
    }
}

fn id_flag(kind: Option<TaxIdKind>) -> &'static str {
    match kind {
        Some(kind) => kind.report_flag(),
        None => "2",
    }
}

/// Projects posted documents into 606/607 rows for a period.
pub struct ReportExtractor<D> {
    catalog: Arc<DocumentTypeCatalog>,
    documents: Arc<D>,
}

impl<D: DocumentStore> ReportExtractor<D> {
    pub fn new(catalog: Arc<DocumentTypeCatalog>, documents: Arc<D>) -> Self {
        Self { catalog, documents }
    }

    pub fn rows(
        &self,
        kind: ReportKind,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
        include_voided: bool,
    ) -> Result<Vec<ReportRow>, ReportError> {
        match kind {
            ReportKind::Sales => self.sales_rows(company, from, to, include_voided),
            ReportKind::Purchases => self.purchase_rows(company, from, to, include_voided),
        }
    }

    /// Sale-side documents carrying a fiscal type, ordered by issue date
    /// then id. An empty period yields an empty report, not an error.
    pub fn sales_rows(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
        include_voided: bool,
    ) -> Result<Vec<ReportRow>, ReportError> {
        let documents = self.in_period(company, from, to, include_voided)?;
        Ok(documents
            .iter()
            .filter(|document| document.kind.is_sale() && self.is_fiscal(document))
            .map(ReportRow::from_sale)
            .collect())
    }

    pub fn purchase_rows(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
        include_voided: bool,
    ) -> Result<Vec<ReportRow>, ReportError> {
        let documents = self.in_period(company, from, to, include_voided)?;
        Ok(documents
            .iter()
            .filter(|document| document.kind.is_purchase())
            .map(ReportRow::from_purchase)
            .collect())
    }

    fn in_period(
        &self,
        company: &CompanyId,
        from: NaiveDate,
        to: NaiveDate,
        include_voided: bool,
    ) -> Result<Vec<BusinessDocument>, ReportError> {
        if from > to {
            return Err(ReportError::InvalidDateRange { from, to });
        }
        let mut documents: Vec<BusinessDocument> = self
            .documents
            .in_period(company, from, to)?
            .into_iter()
            .filter(|document| match document.state {
                DocumentState::Posted => true,
                DocumentState::Voided => include_voided,
                DocumentState::Draft => false,
            })
            .collect();
        // Filing order: issue date, then the document's own identifier, so
        // ties never depend on supplier-provided numbers.
        documents.sort_by(|a, b| {
            a.issue_date
                .cmp(&b.issue_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(documents)
    }

    fn is_fiscal(&self, document: &BusinessDocument) -> bool {
        document
            .document_type
            .as_ref()
            .and_then(|code| self.catalog.get(code))
            .is_some_and(|document_type| document_type.is_fiscal)
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report period start {from} is after its end {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode report: {0}")]
    Encode(#[from] csv::Error),
}
