//! Pure encoders for the 606/607 row sets. Same rows in, same bytes out.

use chrono::NaiveDate;

use super::{ReportError, ReportKind, ReportRow};

/// 606 column headers, in filing order.
pub const SALES_HEADERS: [&str; 17] = [
    "RNC/Cédula",
    "Tipo ID",
    "Número Comprobante",
    "NCF Modificado",
    "Tipo Comprobante",
    "Fecha Comprobante",
    "Fecha Vencimiento",
    "Monto Facturado",
    "ITBIS Facturado",
    "ITBIS Retenido",
    "ITBIS Percibido",
    "Retención Renta",
    "ISR Percibido",
    "Impuesto Selectivo Consumo",
    "Otros Impuestos/Tasas",
    "Monto Propina Legal",
    "Forma de Pago",
];

/// 607 column headers, in filing order.
pub const PURCHASE_HEADERS: [&str; 18] = [
    "RNC/Cédula",
    "Tipo ID",
    "Tipo Bienes y Servicios Comprados",
    "NCF",
    "NCF Modificado",
    "Tipo Comprobante",
    "Fecha Comprobante",
    "Fecha de Pago",
    "Monto Facturado",
    "ITBIS Facturado",
    "ITBIS Retenido por Terceros",
    "ITBIS Percibido",
    "Retención Renta por Terceros",
    "ISR Percibido",
    "Impuesto Selectivo Consumo",
    "Otros Impuestos/Tasas",
    "Monto Propina Legal",
    "Forma de Pago",
];

/// Fixed-width line length of a 606 record.
pub const SALES_ROW_LEN: usize = 68;
/// Fixed-width line length of a 607 record.
pub const PURCHASE_ROW_LEN: usize = 59;

/// Spreadsheet-style encoding: header row, one row per document, trailing
/// totals row with the invoiced and tax sums.
pub fn write_tabular(kind: ReportKind, rows: &[ReportRow]) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    match kind {
        ReportKind::Sales => writer.write_record(SALES_HEADERS)?,
        ReportKind::Purchases => writer.write_record(PURCHASE_HEADERS)?,
    }

    let mut total_invoiced: i64 = 0;
    let mut total_tax: i64 = 0;
    for row in rows {
        total_invoiced += row.invoiced_cents;
        total_tax += row.tax_cents;
        match kind {
            ReportKind::Sales => writer.write_record([
                row.tax_id.as_str(),
                row.tax_id_flag,
                row.fiscal_number.as_str(),
                row.modified_fiscal_number.as_str(),
                row.document_type.as_str(),
                &tabular_date(row.issue_date),
                &tabular_date(row.secondary_date),
                &money(row.invoiced_cents),
                &money(row.tax_cents),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                row.payment_method,
            ])?,
            ReportKind::Purchases => writer.write_record([
                row.tax_id.as_str(),
                row.tax_id_flag,
                row.goods_class,
                row.fiscal_number.as_str(),
                row.modified_fiscal_number.as_str(),
                row.document_type.as_str(),
                &tabular_date(row.issue_date),
                &tabular_date(row.secondary_date),
                &money(row.invoiced_cents),
                &money(row.tax_cents),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                &money(0),
                row.payment_method,
            ])?,
        }
    }

    writer.write_record(totals_record(kind, total_invoiced, total_tax))?;
    let buffer = writer.into_inner().map_err(|error| csv::Error::from(error.into_error()))?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// The totals row keeps the full column width, label aligned just before
/// the amount columns.
fn totals_record(kind: ReportKind, total_invoiced: i64, total_tax: i64) -> Vec<String> {
    let (width, label_at) = match kind {
        ReportKind::Sales => (SALES_HEADERS.len(), 6),
        ReportKind::Purchases => (PURCHASE_HEADERS.len(), 7),
    };
    let mut record = vec![String::new(); width];
    record[label_at] = "TOTALES:".to_owned();
    record[label_at + 1] = money(total_invoiced);
    record[label_at + 2] = money(total_tax);
    record
}

/// Fixed-width text encoding for DGII submission, one line per document,
/// joined by a single newline with no trailing one.
pub fn write_fixed_width(kind: ReportKind, rows: &[ReportRow]) -> String {
    let lines: Vec<String> = rows
        .iter()
        .map(|row| match kind {
            ReportKind::Sales => format!(
                "{:<11}{:<1}{:<11}{:<11}{:<2}{}{:>12}{:>12}",
                strip_dashes(&row.tax_id),
                row.tax_id_flag,
                row.fiscal_number,
                row.modified_fiscal_number,
                row.document_type,
                text_date(row.issue_date),
                row.invoiced_cents,
                row.tax_cents,
            ),
            ReportKind::Purchases => format!(
                "{:<11}{:<1}{:<2}{:<11}{:<2}{}{:>12}{:>12}",
                strip_dashes(&row.tax_id),
                row.tax_id_flag,
                row.goods_class,
                row.fiscal_number,
                row.document_type,
                text_date(row.issue_date),
                row.invoiced_cents,
                row.tax_cents,
            ),
        })
        .collect();
    lines.join("\n")
}

pub fn tabular_file_name(kind: ReportKind, from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "reporte_{}_{}_{}.csv",
        kind.number(),
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    )
}

pub fn text_file_name(kind: ReportKind, from: NaiveDate) -> String {
    format!("{}_{}.txt", kind.number(), from.format("%m%Y"))
}

fn tabular_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn text_date(date: NaiveDate) -> String {
    date.format("%d%m%Y").to_string()
}

fn strip_dashes(tax_id: &str) -> String {
    tax_id.replace('-', "")
}

fn money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}
