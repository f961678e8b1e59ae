use chrono::{Duration, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use ncf_fiscal::config::AlertConfig;
use ncf_fiscal::error::AppError;
use ncf_fiscal::fiscal::{
    BusinessDocument, CompanyId, Counterparty, DocumentBinder, DocumentId, DocumentKind,
    DocumentStore, DocumentTypeCatalog, FiscalNumber, InMemoryDocumentStore, InMemorySequenceStore,
    ReportExtractor, SequenceAllocator, SequenceRange, SequenceRangeId, SequenceStore, Series,
    TaxIdKind, TypeCode,
};
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The wired fiscal services the routes and CLI commands share. Everything
/// runs against the in-memory stores; a persistent backend would slot in
/// behind the same traits.
pub(crate) struct FiscalStack {
    pub(crate) company: CompanyId,
    pub(crate) binder: DocumentBinder<InMemorySequenceStore, InMemoryDocumentStore>,
    pub(crate) extractor: ReportExtractor<InMemoryDocumentStore>,
}

/// Builds the stack with the DGII type catalog and a set of authorized
/// ranges valid around `today`.
pub(crate) fn demo_stack(alerts: AlertConfig, today: NaiveDate) -> Result<FiscalStack, AppError> {
    let company = CompanyId("main".to_string());
    let catalog = Arc::new(DocumentTypeCatalog::standard());

    let sequences = Arc::new(InMemorySequenceStore::default());
    let valid_from = today - Duration::days(120);
    let valid_until = today + Duration::days(300);
    for (id, code, start, end) in [
        ("seq-b01", "01", 1u32, 5_000u32),
        ("seq-b02", "02", 1, 10_000),
        ("seq-b04", "04", 1, 500),
    ] {
        let range = SequenceRange::new(
            SequenceRangeId(id.to_string()),
            format!("{} authorization", today.format("%Y")),
            company.clone(),
            TypeCode::new(code)?,
            Series::new('B')?,
            start,
            end,
            valid_from,
            valid_until,
        )?
        .with_alert_thresholds(alerts);
        sequences.insert(range).map_err(store_error)?;
    }

    // One nearly exhausted range so the alert path has something to say.
    let mut scarce = SequenceRange::new(
        SequenceRangeId("seq-b14".to_string()),
        "Régimen especial authorization",
        company.clone(),
        TypeCode::new("14")?,
        Series::new('B')?,
        1,
        25,
        valid_from,
        valid_until,
    )?
    .with_alert_thresholds(alerts);
    scarce.cursor = 20;
    sequences.insert(scarce).map_err(store_error)?;

    let documents = Arc::new(InMemoryDocumentStore::default());
    let binder = DocumentBinder::new(
        Arc::clone(&catalog),
        SequenceAllocator::new(Arc::clone(&sequences)),
        Arc::clone(&documents),
    );
    let extractor = ReportExtractor::new(catalog, documents);

    Ok(FiscalStack {
        company,
        binder,
        extractor,
    })
}

/// Inserts and posts a handful of documents so reports and previews have
/// data to work with.
pub(crate) fn seed_documents(stack: &FiscalStack, today: NaiveDate) -> Result<(), AppError> {
    let taxpayer = Counterparty {
        name: "Ferretería Central SRL".to_string(),
        tax_id: Some("131-24681-5".to_string()),
        tax_id_kind: Some(TaxIdKind::Rnc),
        is_registered_taxpayer: true,
    };
    let consumer = Counterparty {
        name: "Consumidor Final".to_string(),
        tax_id: None,
        tax_id_kind: None,
        is_registered_taxpayer: false,
    };

    let sales: [(&str, DocumentKind, Counterparty, &str, i64, i64); 3] = [
        ("inv-1001", DocumentKind::SaleInvoice, taxpayer.clone(), "01", 30_000, 5_400),
        ("inv-1002", DocumentKind::SaleInvoice, consumer, "02", 150_000, 27_000),
        ("cn-2001", DocumentKind::CreditNote, taxpayer.clone(), "04", 10_000, 1_800),
    ];
    for (id, kind, counterparty, code, untaxed, tax) in sales {
        let mut document = BusinessDocument::draft(
            DocumentId(id.to_string()),
            stack.company.clone(),
            kind,
            counterparty,
            today,
        );
        document.document_type = Some(TypeCode::new(code)?);
        document.untaxed_cents = untaxed;
        document.tax_cents = tax;
        stack
            .binder
            .documents()
            .insert(document)
            .map_err(store_error)?;
        stack.binder.post_document(&DocumentId(id.to_string()), today)?;
    }

    // A supplier bill carries the NCF printed on the supplier's invoice.
    let mut bill = BusinessDocument::draft(
        DocumentId("bill-3001".to_string()),
        stack.company.clone(),
        DocumentKind::PurchaseInvoice,
        taxpayer,
        today,
    );
    bill.untaxed_cents = 45_000;
    bill.tax_cents = 8_100;
    bill.fiscal_number = Some(
        FiscalNumber::parse("A0100000042")
            .map_err(|err| AppError::Bind(err.into()))?,
    );
    stack
        .binder
        .documents()
        .insert(bill)
        .map_err(store_error)?;
    stack
        .binder
        .post_document(&DocumentId("bill-3001".to_string()), today)?;

    Ok(())
}

fn store_error(err: ncf_fiscal::fiscal::StoreError) -> AppError {
    AppError::Bind(err.into())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
