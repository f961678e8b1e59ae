use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::catalog::TypeCode;
use super::sequence::{FiscalNumber, SequenceRangeId};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    SaleInvoice,
    CreditNote,
    DebitNote,
    PosOrder,
    PurchaseInvoice,
    PurchaseRefund,
}

impl DocumentKind {
    pub const fn is_sale(self) -> bool {
        matches!(
            self,
            Self::SaleInvoice | Self::CreditNote | Self::DebitNote | Self::PosOrder
        )
    }

    pub const fn is_purchase(self) -> bool {
        matches!(self, Self::PurchaseInvoice | Self::PurchaseRefund)
    }

    /// Credit and debit notes amend a previously issued document and must
    /// reference its NCF in the 606 filing.
    pub const fn is_amendment(self) -> bool {
        matches!(self, Self::CreditNote | Self::DebitNote)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SaleInvoice => "Sale Invoice",
            Self::CreditNote => "Credit Note",
            Self::DebitNote => "Debit Note",
            Self::PosOrder => "POS Order",
            Self::PurchaseInvoice => "Purchase Invoice",
            Self::PurchaseRefund => "Purchase Refund",
        }
    }
}

/// Document lifecycle: draft -> posted -> voided. Numbers are assigned at
/// the post transition and survive voiding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Draft,
    Posted,
    Voided,
}

impl DocumentState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Posted => "Posted",
            Self::Voided => "Voided",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxIdKind {
    Rnc,
    Cedula,
    Passport,
}

impl TaxIdKind {
    /// Identifier-kind column flag in the 606/607 filings.
    pub const fn report_flag(self) -> &'static str {
        match self {
            Self::Rnc => "1",
            Self::Cedula | Self::Passport => "2",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterparty {
    pub name: String,
    pub tax_id: Option<String>,
    pub tax_id_kind: Option<TaxIdKind>,
    pub is_registered_taxpayer: bool,
}

impl Counterparty {
    pub fn has_tax_id(&self) -> bool {
        self.tax_id
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

/// An invoice, credit/debit note, or POS order as seen by the fiscal layer.
/// Amounts are carried in integer cents so report encodings stay exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessDocument {
    pub id: DocumentId,
    pub company: CompanyId,
    pub kind: DocumentKind,
    pub document_type: Option<TypeCode>,
    pub counterparty: Counterparty,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub untaxed_cents: i64,
    pub tax_cents: i64,
    pub state: DocumentState,
    pub fiscal_number: Option<FiscalNumber>,
    pub modified_fiscal_number: Option<FiscalNumber>,
    pub consumed_range: Option<SequenceRangeId>,
    pub voided_on: Option<NaiveDate>,
    pub void_reason: Option<String>,
}

impl BusinessDocument {
    pub fn draft(
        id: DocumentId,
        company: CompanyId,
        kind: DocumentKind,
        counterparty: Counterparty,
        issue_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            company,
            kind,
            document_type: None,
            counterparty,
            issue_date,
            due_date: None,
            untaxed_cents: 0,
            tax_cents: 0,
            state: DocumentState::Draft,
            fiscal_number: None,
            modified_fiscal_number: None,
            consumed_range: None,
            voided_on: None,
            void_reason: None,
        }
    }

    pub fn total_cents(&self) -> i64 {
        self.untaxed_cents + self.tax_cents
    }
}
