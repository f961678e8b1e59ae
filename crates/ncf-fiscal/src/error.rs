use crate::config::ConfigError;
use crate::fiscal::{
    AllocationError, BindError, CatalogError, ReportError, SequenceConfigError, StoreError,
};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Catalog(CatalogError),
    Sequence(SequenceConfigError),
    Bind(BindError),
    Report(ReportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Catalog(err) => write!(f, "catalog error: {}", err),
            AppError::Sequence(err) => write!(f, "sequence configuration error: {}", err),
            AppError::Bind(err) => write!(f, "fiscal numbering error: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Sequence(err) => Some(err),
            AppError::Bind(err) => Some(err),
            AppError::Report(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Bind(err) => bind_status(err),
            AppError::Report(ReportError::InvalidDateRange { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Catalog(_) | AppError::Sequence(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Numbering failures map onto the HTTP surface by category: bad input is
/// 422, a sequence the caller must fix is 409, transient contention is 503.
fn bind_status(error: &BindError) -> StatusCode {
    match error {
        BindError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
        BindError::MissingDocumentType
        | BindError::MissingTaxId { .. }
        | BindError::UnknownDocumentType(_)
        | BindError::InvalidFormat(_)
        | BindError::NotDraft(_)
        | BindError::NotPosted(_)
        | BindError::NotVoided(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BindError::DuplicateNumber { .. } => StatusCode::CONFLICT,
        BindError::Allocation(allocation) => match allocation {
            AllocationError::NoActiveSequence { .. }
            | AllocationError::SequenceUnavailable { .. }
            | AllocationError::SequenceExhausted { .. } => StatusCode::CONFLICT,
            AllocationError::AllocationConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AllocationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        BindError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        BindError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<SequenceConfigError> for AppError {
    fn from(value: SequenceConfigError) -> Self {
        Self::Sequence(value)
    }
}

impl From<BindError> for AppError {
    fn from(value: BindError) -> Self {
        Self::Bind(value)
    }
}

impl From<AllocationError> for AppError {
    fn from(value: AllocationError) -> Self {
        Self::Bind(BindError::Allocation(value))
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}
