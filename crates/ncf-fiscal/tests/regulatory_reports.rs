use std::sync::Arc;

use chrono::NaiveDate;
use ncf_fiscal::fiscal::report::{write_fixed_width, write_tabular, PURCHASE_ROW_LEN, SALES_ROW_LEN};
use ncf_fiscal::fiscal::{
    BusinessDocument, CompanyId, Counterparty, DocumentId, DocumentKind, DocumentState,
    DocumentStore, DocumentTypeCatalog, FiscalNumber, InMemoryDocumentStore, ReportError,
    ReportExtractor, ReportKind, TaxIdKind, TypeCode,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn company() -> CompanyId {
    CompanyId("main".to_string())
}

fn extractor() -> (ReportExtractor<InMemoryDocumentStore>, Arc<InMemoryDocumentStore>) {
    let documents = Arc::new(InMemoryDocumentStore::default());
    let extractor = ReportExtractor::new(
        Arc::new(DocumentTypeCatalog::standard()),
        Arc::clone(&documents),
    );
    (extractor, documents)
}

fn posted_sale(
    id: &str,
    issue: NaiveDate,
    ncf: &str,
    untaxed_cents: i64,
    tax_cents: i64,
) -> BusinessDocument {
    let mut document = BusinessDocument::draft(
        DocumentId(id.to_string()),
        company(),
        DocumentKind::SaleInvoice,
        Counterparty {
            name: "Ferretería Central SRL".to_string(),
            tax_id: Some("131-24681-5".to_string()),
            tax_id_kind: Some(TaxIdKind::Rnc),
            is_registered_taxpayer: true,
        },
        issue,
    );
    document.document_type = Some(TypeCode::new("01").expect("valid code"));
    document.untaxed_cents = untaxed_cents;
    document.tax_cents = tax_cents;
    document.state = DocumentState::Posted;
    document.fiscal_number = Some(FiscalNumber::parse(ncf).expect("well formed"));
    document
}

fn posted_purchase(id: &str, issue: NaiveDate, supplier_ncf: &str) -> BusinessDocument {
    let mut document = BusinessDocument::draft(
        DocumentId(id.to_string()),
        company(),
        DocumentKind::PurchaseInvoice,
        Counterparty {
            name: "Distribuidora del Este".to_string(),
            tax_id: Some("101-55555-1".to_string()),
            tax_id_kind: Some(TaxIdKind::Rnc),
            is_registered_taxpayer: true,
        },
        issue,
    );
    document.untaxed_cents = 10_000;
    document.tax_cents = 1_800;
    document.state = DocumentState::Posted;
    document.fiscal_number = Some(FiscalNumber::parse(supplier_ncf).expect("well formed"));
    document
}

#[test]
fn sales_rows_are_filtered_and_ordered() {
    let (extractor, documents) = extractor();
    documents
        .insert(posted_sale("inv-2", date(2026, 3, 10), "B0100000002", 30_000, 7_500))
        .expect("insert");
    documents
        .insert(posted_sale("inv-1", date(2026, 3, 5), "B0100000001", 20_000, 3_600))
        .expect("insert");
    // Purchases and drafts never reach the sales filing.
    documents
        .insert(posted_purchase("bill-1", date(2026, 3, 7), "B0100000099"))
        .expect("insert");
    let mut draft = posted_sale("inv-3", date(2026, 3, 8), "B0100000003", 5_000, 900);
    draft.state = DocumentState::Draft;
    draft.fiscal_number = None;
    documents.insert(draft).expect("insert");

    let rows = extractor
        .sales_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].fiscal_number, "B0100000001");
    assert_eq!(rows[1].fiscal_number, "B0100000002");
    assert_eq!(rows[0].tax_id_flag, "1");
}

#[test]
fn same_day_ties_break_on_the_document_id() {
    let (extractor, documents) = extractor();
    // Same issue date, with NCFs deliberately out of id order.
    documents
        .insert(posted_sale("inv-a", date(2026, 3, 5), "B0100000009", 20_000, 3_600))
        .expect("insert");
    documents
        .insert(posted_sale("inv-b", date(2026, 3, 5), "B0100000002", 10_000, 1_800))
        .expect("insert");

    let rows = extractor
        .sales_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    assert_eq!(rows[0].fiscal_number, "B0100000009");
    assert_eq!(rows[1].fiscal_number, "B0100000002");
}

#[test]
fn voided_documents_are_excluded_unless_requested() {
    let (extractor, documents) = extractor();
    documents
        .insert(posted_sale("inv-1", date(2026, 3, 5), "B0100000001", 20_000, 3_600))
        .expect("insert");
    let mut voided = posted_sale("inv-2", date(2026, 3, 6), "B0100000002", 10_000, 1_800);
    voided.state = DocumentState::Voided;
    voided.voided_on = Some(date(2026, 3, 7));
    documents.insert(voided).expect("insert");

    let rows = extractor
        .sales_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    assert_eq!(rows.len(), 1);

    let with_voided = extractor
        .sales_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), true)
        .expect("rows");
    assert_eq!(with_voided.len(), 2);
    // The voided document still carries its NCF in the filing.
    assert!(with_voided
        .iter()
        .any(|row| row.fiscal_number == "B0100000002"));
}

#[test]
fn inverted_period_is_rejected() {
    let (extractor, _documents) = extractor();
    assert!(matches!(
        extractor.sales_rows(&company(), date(2026, 4, 1), date(2026, 3, 1), false),
        Err(ReportError::InvalidDateRange { .. })
    ));
}

#[test]
fn empty_period_yields_an_empty_report() {
    let (extractor, _documents) = extractor();
    let rows = extractor
        .sales_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    assert!(rows.is_empty());
    let encoded = write_tabular(ReportKind::Sales, &rows).expect("encode");
    assert!(encoded.contains("TOTALES:"));
}

#[test]
fn tabular_totals_add_up() {
    let (extractor, documents) = extractor();
    documents
        .insert(posted_sale("inv-1", date(2026, 3, 5), "B0100000001", 30_000, 7_500))
        .expect("insert");

    let rows = extractor
        .sales_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    assert_eq!(rows[0].invoiced_cents, 37_500);

    let csv = write_tabular(ReportKind::Sales, &rows).expect("encode");
    let totals = csv.lines().last().expect("totals line");
    assert!(totals.contains("TOTALES:"));
    assert!(totals.contains("375.00"));
    assert!(totals.contains("75.00"));
}

#[test]
fn fixed_width_lines_have_the_filing_widths() {
    let (extractor, documents) = extractor();
    documents
        .insert(posted_sale("inv-1", date(2026, 3, 5), "B0100000001", 30_000, 7_500))
        .expect("insert");
    documents
        .insert(posted_purchase("bill-1", date(2026, 3, 6), "B0100000042"))
        .expect("insert");

    let sales = extractor
        .sales_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    let text = write_fixed_width(ReportKind::Sales, &sales);
    for line in text.lines() {
        assert_eq!(line.len(), SALES_ROW_LEN);
    }
    // Dashes are stripped from the tax id in the text format.
    assert!(text.starts_with("131246815  "));

    let purchases = extractor
        .purchase_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    let text = write_fixed_width(ReportKind::Purchases, &purchases);
    for line in text.lines() {
        assert_eq!(line.len(), PURCHASE_ROW_LEN);
    }
    assert!(text.contains("B0100000042"));
}

#[test]
fn purchase_rows_use_the_filing_defaults() {
    let (extractor, documents) = extractor();
    documents
        .insert(posted_purchase("bill-1", date(2026, 3, 6), "B0100000042"))
        .expect("insert");

    let rows = extractor
        .purchase_rows(&company(), date(2026, 3, 1), date(2026, 3, 31), false)
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].goods_class, "01");
    assert_eq!(rows[0].document_type, "01");
    assert_eq!(rows[0].modified_fiscal_number, "");
    assert_eq!(rows[0].payment_method, "01");
    assert_eq!(rows[0].secondary_date, rows[0].issue_date);
}
