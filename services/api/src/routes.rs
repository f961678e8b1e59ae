use crate::infra::{deserialize_date, deserialize_optional_date, AppState, FiscalStack};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use ncf_fiscal::error::AppError;
use ncf_fiscal::fiscal::report::{
    tabular_file_name, text_file_name, write_fixed_width, write_tabular,
};
use ncf_fiscal::fiscal::{
    BusinessDocument, CompanyId, Counterparty, DocumentId, DocumentKind, DocumentStore, NcfPreview,
    ReportKind, TypeCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateDocumentRequest {
    pub(crate) id: String,
    pub(crate) company: String,
    pub(crate) kind: DocumentKind,
    #[serde(default)]
    pub(crate) document_type: Option<TypeCode>,
    pub(crate) counterparty: Counterparty,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) issue_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) due_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) untaxed_cents: i64,
    #[serde(default)]
    pub(crate) tax_cents: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TodayQuery {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreviewQuery {
    pub(crate) document_type: TypeCode,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ReportFormat {
    #[default]
    Csv,
    Txt,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) from: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) to: NaiveDate,
    #[serde(default)]
    pub(crate) include_voided: bool,
    #[serde(default)]
    pub(crate) format: ReportFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) number: String,
    pub(crate) sequence: String,
    pub(crate) available: u32,
}

pub(crate) fn with_fiscal_routes(stack: Arc<FiscalStack>) -> axum::Router {
    axum::Router::new()
        .route("/api/v1/documents", axum::routing::post(create_document))
        .route("/api/v1/documents/:id", axum::routing::get(get_document))
        .route(
            "/api/v1/documents/:id/post",
            axum::routing::post(post_document_endpoint),
        )
        .route(
            "/api/v1/documents/:id/ncf-preview",
            axum::routing::get(document_preview_endpoint),
        )
        .route("/api/v1/ncf/preview", axum::routing::get(ncf_preview_endpoint))
        .route("/api/v1/reports/:kind", axum::routing::get(report_endpoint))
        .with_state(stack)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn create_document(
    State(stack): State<Arc<FiscalStack>>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<BusinessDocument>), AppError> {
    let CreateDocumentRequest {
        id,
        company,
        kind,
        document_type,
        counterparty,
        issue_date,
        due_date,
        untaxed_cents,
        tax_cents,
    } = payload;

    let mut document = BusinessDocument::draft(
        DocumentId(id),
        CompanyId(company),
        kind,
        counterparty,
        issue_date,
    );
    document.document_type = document_type;
    document.due_date = due_date;
    document.untaxed_cents = untaxed_cents;
    document.tax_cents = tax_cents;

    let inserted = stack
        .binder
        .documents()
        .insert(document)
        .map_err(|err| AppError::Bind(err.into()))?;
    Ok((StatusCode::CREATED, Json(inserted)))
}

pub(crate) async fn get_document(
    State(stack): State<Arc<FiscalStack>>,
    Path(id): Path<String>,
) -> Result<Json<BusinessDocument>, AppError> {
    let id = DocumentId(id);
    let document = stack
        .binder
        .documents()
        .fetch(&id)
        .map_err(|err| AppError::Bind(err.into()))?
        .ok_or_else(|| AppError::Bind(ncf_fiscal::fiscal::BindError::DocumentNotFound(id)))?;
    Ok(Json(document))
}

pub(crate) async fn post_document_endpoint(
    State(stack): State<Arc<FiscalStack>>,
    Path(id): Path<String>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<BusinessDocument>, AppError> {
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    let posted = stack.binder.post_document(&DocumentId(id), today)?;
    Ok(Json(posted))
}

pub(crate) async fn document_preview_endpoint(
    State(stack): State<Arc<FiscalStack>>,
    Path(id): Path<String>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<Option<NcfPreview>>, AppError> {
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    let preview = stack.binder.preview_next(&DocumentId(id), today)?;
    Ok(Json(preview))
}

/// Standalone preview by document type, for confirmation screens that have
/// not created a draft yet.
pub(crate) async fn ncf_preview_endpoint(
    State(stack): State<Arc<FiscalStack>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, AppError> {
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    let range = stack
        .binder
        .allocator()
        .find_active_range(&query.document_type, &stack.company, today)?;
    let number = stack.binder.allocator().preview(&range);
    Ok(Json(PreviewResponse {
        number: number.as_str().to_string(),
        sequence: range.display_label(),
        available: range.available(),
    }))
}

pub(crate) async fn report_endpoint(
    State(stack): State<Arc<FiscalStack>>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let kind = match kind.as_str() {
        "606" => ReportKind::Sales,
        "607" => ReportKind::Purchases,
        other => {
            let body = Json(json!({ "error": format!("unknown report kind '{other}'") }));
            return Ok((StatusCode::NOT_FOUND, body).into_response());
        }
    };

    let rows = stack.extractor.rows(
        kind,
        &stack.company,
        query.from,
        query.to,
        query.include_voided,
    )?;

    let (body, file_name, content_type) = match query.format {
        ReportFormat::Csv => (
            write_tabular(kind, &rows).map_err(AppError::Report)?,
            tabular_file_name(kind, query.from, query.to),
            "text/csv; charset=utf-8",
        ),
        ReportFormat::Txt => (
            write_fixed_width(kind, &rows),
            text_file_name(kind, query.from),
            "text/plain; charset=utf-8",
        ),
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{demo_stack, seed_documents};
    use ncf_fiscal::config::AlertConfig;
    use ncf_fiscal::fiscal::TaxIdKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn stack() -> Arc<FiscalStack> {
        let today = date(2026, 6, 1);
        Arc::new(demo_stack(AlertConfig::default(), today).expect("stack builds"))
    }

    fn create_request(id: &str) -> CreateDocumentRequest {
        CreateDocumentRequest {
            id: id.to_string(),
            company: "main".to_string(),
            kind: DocumentKind::SaleInvoice,
            document_type: Some(TypeCode::new("01").expect("valid code")),
            counterparty: Counterparty {
                name: "Ferretería Central SRL".to_string(),
                tax_id: Some("131-24681-5".to_string()),
                tax_id_kind: Some(TaxIdKind::Rnc),
                is_registered_taxpayer: true,
            },
            issue_date: date(2026, 6, 1),
            due_date: None,
            untaxed_cents: 30_000,
            tax_cents: 5_400,
        }
    }

    #[tokio::test]
    async fn create_post_and_fetch_round_trip() {
        let stack = stack();

        let (status, Json(created)) =
            create_document(State(stack.clone()), Json(create_request("inv-1")))
                .await
                .expect("create");
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.fiscal_number.is_none());

        let Json(posted) = post_document_endpoint(
            State(stack.clone()),
            Path("inv-1".to_string()),
            Query(TodayQuery {
                today: Some(date(2026, 6, 1)),
            }),
        )
        .await
        .expect("post");
        assert_eq!(
            posted.fiscal_number.expect("number assigned").as_str(),
            "B0100000001"
        );

        let Json(fetched) = get_document(State(stack), Path("inv-1".to_string()))
            .await
            .expect("fetch");
        assert_eq!(
            fetched.fiscal_number.expect("number persisted").as_str(),
            "B0100000001"
        );
    }

    #[tokio::test]
    async fn missing_document_maps_to_not_found() {
        let stack = stack();
        let err = get_document(State(stack), Path("nope".to_string()))
            .await
            .expect_err("missing document");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preview_reports_the_next_number_without_consuming() {
        let stack = stack();
        let query = PreviewQuery {
            document_type: TypeCode::new("01").expect("valid code"),
            today: Some(date(2026, 6, 1)),
        };
        let Json(first) = ncf_preview_endpoint(State(stack.clone()), Query(query))
            .await
            .expect("preview");
        assert_eq!(first.number, "B0100000001");
        assert_eq!(first.available, 5_000);

        let query = PreviewQuery {
            document_type: TypeCode::new("01").expect("valid code"),
            today: Some(date(2026, 6, 1)),
        };
        let Json(second) = ncf_preview_endpoint(State(stack), Query(query))
            .await
            .expect("preview");
        assert_eq!(second.number, "B0100000001");
    }

    #[tokio::test]
    async fn report_endpoint_streams_the_filing() {
        let stack = stack();
        seed_documents(&stack, date(2026, 6, 1)).expect("seed");

        let response = report_endpoint(
            State(stack),
            Path("606".to_string()),
            Query(ReportQuery {
                from: date(2026, 6, 1),
                to: date(2026, 6, 30),
                include_voided: false,
                format: ReportFormat::Csv,
            }),
        )
        .await
        .expect("report");
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .expect("disposition header")
            .to_str()
            .expect("ascii header");
        assert!(disposition.contains("reporte_606_2026-06-01_2026-06-30.csv"));
    }

    #[tokio::test]
    async fn unknown_report_kind_is_rejected() {
        let stack = stack();
        let response = report_endpoint(
            State(stack),
            Path("608".to_string()),
            Query(ReportQuery {
                from: date(2026, 6, 1),
                to: date(2026, 6, 30),
                include_voided: false,
                format: ReportFormat::Txt,
            }),
        )
        .await
        .expect("handled");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
