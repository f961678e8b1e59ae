use crate::infra::{demo_stack, seed_documents, FiscalStack};
use chrono::{Datelike, Local, NaiveDate};
use clap::Args;
use ncf_fiscal::config::AlertConfig;
use ncf_fiscal::error::AppError;
use ncf_fiscal::fiscal::report::{
    tabular_file_name, text_file_name, write_fixed_width, write_tabular,
};
use ncf_fiscal::fiscal::{
    Counterparty, DocumentKind, DocumentStore, ReportKind, TaxIdKind, TypeCode,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (YYYY-MM-DD, defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Report kind: 606 (sales) or 607 (purchases)
    #[arg(long, value_parser = parse_report_kind)]
    pub(crate) kind: ReportKind,
    /// Period start (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) from: NaiveDate,
    /// Period end (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) to: NaiveDate,
    /// Include voided documents in the filing
    #[arg(long)]
    pub(crate) include_voided: bool,
    /// Output format
    #[arg(long, default_value = "csv", value_parser = ["csv", "txt"])]
    pub(crate) format: String,
    /// Write the filing to a file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

fn parse_report_kind(raw: &str) -> Result<ReportKind, String> {
    match raw.trim() {
        "606" => Ok(ReportKind::Sales),
        "607" => Ok(ReportKind::Purchases),
        other => Err(format!("report kind must be 606 or 607, got '{other}'")),
    }
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        kind,
        from,
        to,
        include_voided,
        format,
        output,
    } = args;

    let today = Local::now().date_naive();
    let stack = demo_stack(AlertConfig::default(), today)?;
    seed_documents(&stack, today)?;

    let rows = stack
        .extractor
        .rows(kind, &stack.company, from, to, include_voided)?;

    let (body, file_name) = if format == "txt" {
        (write_fixed_width(kind, &rows), text_file_name(kind, from))
    } else {
        (
            write_tabular(kind, &rows).map_err(AppError::Report)?,
            tabular_file_name(kind, from, to),
        )
    };

    match output {
        Some(path) => {
            std::fs::write(&path, body)?;
            println!("Wrote {} ({} rows) to {}", file_name, rows.len(), path.display());
        }
        None => {
            println!("{file_name}");
            println!("{body}");
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    println!("NCF fiscal numbering demo ({today})");
    let stack = demo_stack(AlertConfig::default(), today)?;

    print_suggestions(&stack);
    print_previews(&stack, today)?;

    println!("\nPosting the seeded documents");
    seed_documents(&stack, today)?;
    for id in ["inv-1001", "inv-1002", "cn-2001", "bill-3001"] {
        let document = stack
            .binder
            .documents()
            .fetch(&ncf_fiscal::fiscal::DocumentId(id.to_string()))
            .map_err(|err| AppError::Bind(err.into()))?;
        if let Some(document) = document {
            let number = document
                .fiscal_number
                .as_ref()
                .map(|number| number.as_str().to_string())
                .unwrap_or_else(|| "(no NCF)".to_string());
            println!(
                "- {} | {} | {} | total {}",
                document.id,
                document.kind.label(),
                number,
                format_money(document.total_cents())
            );
        }
    }

    println!("\nSequence alerts");
    let alerts = stack
        .binder
        .allocator()
        .alerts_for_company(&stack.company, today)
        .map_err(|err| AppError::Bind(err.into()))?;
    if alerts.is_empty() {
        println!("- none");
    } else {
        for alert in alerts {
            for line in alert.lines() {
                println!("- {line}");
            }
        }
    }

    let from = today.with_day(1).unwrap_or(today);
    println!("\n606 filing for {} .. {}", from, today);
    let rows = stack
        .extractor
        .sales_rows(&stack.company, from, today, false)?;
    println!("{}", write_tabular(ReportKind::Sales, &rows).map_err(AppError::Report)?);
    println!("Fixed-width submission ({}):", text_file_name(ReportKind::Sales, from));
    println!("{}", write_fixed_width(ReportKind::Sales, &rows));

    println!("\n607 filing for {} .. {}", from, today);
    let rows = stack
        .extractor
        .purchase_rows(&stack.company, from, today, false)?;
    println!("{}", write_tabular(ReportKind::Purchases, &rows).map_err(AppError::Report)?);
    println!("Fixed-width submission ({}):", text_file_name(ReportKind::Purchases, from));
    println!("{}", write_fixed_width(ReportKind::Purchases, &rows));

    Ok(())
}

fn print_suggestions(stack: &FiscalStack) {
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

    println!("\nDocument type suggestions");
    for (label, kind, counterparty) in [
        ("registered taxpayer", DocumentKind::SaleInvoice, &taxpayer),
        ("walk-in consumer", DocumentKind::SaleInvoice, &consumer),
        ("credit note", DocumentKind::CreditNote, &taxpayer),
    ] {
        match stack.binder.catalog().suggest_for_sale(kind, counterparty) {
            Some(document_type) => println!(
                "- {}: {} ({})",
                label, document_type.code, document_type.name
            ),
            None => println!("- {}: no suggestion", label),
        }
    }
}

fn print_previews(stack: &FiscalStack, today: NaiveDate) -> Result<(), AppError> {
    println!("\nNext NCF per document type");
    for code in ["01", "02", "04", "14"] {
        let code = TypeCode::new(code)?;
        let range = stack
            .binder
            .allocator()
            .find_active_range(&code, &stack.company, today)?;
        let number = stack.binder.allocator().preview(&range);
        println!(
            "- {}: {} ({} numbers left in {})",
            code,
            number,
            range.available(),
            range.display_label()
        );
    }
    Ok(())
}

fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}
