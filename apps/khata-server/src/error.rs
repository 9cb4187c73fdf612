//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError ─► CoreError ─┐                                        │
//! │                                ├─► ServiceError ─► ApiError ─► HTTP     │
//! │  sqlx::Error ─────► DbError ───┘   (kind())        {code, message}      │
//! │                                                                         │
//! │  Json / Query rejections ─────────────────────────► VALIDATION_ERROR    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Mapping
//! | Code                                       | Status |
//! |--------------------------------------------|--------|
//! | `VALIDATION_ERROR`                         | 400    |
//! | `NOT_FOUND`                                | 404    |
//! | `INSUFFICIENT_STOCK`, `OPERATION_ABORTED`  | 409    |
//! | `UNIT_MISMATCH`, `INVOICE_INCONSISTENT`    | 422    |
//! | `INTERNAL`                                 | 500    |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use khata_core::ErrorKind;
use khata_db::ServiceError;

/// Error body returned by every failing route.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Rice: available 2, requested 5"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorKind,

    /// Human-readable error message for display
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::ValidationError, message)
    }

    pub fn status(&self) -> StatusCode {
        match self.code {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InsufficientStock | ErrorKind::OperationAborted => StatusCode::CONFLICT,
            ErrorKind::UnitMismatch | ErrorKind::InvoiceInconsistent => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let code = err.kind();
        match code {
            ErrorKind::Internal => {
                // Storage details stay in the log
                error!(error = %err, "Internal error");
                ApiError::new(code, "Internal error")
            }
            ErrorKind::OperationAborted => {
                warn!(error = %err, "Operation aborted");
                ApiError::new(code, err.to_string())
            }
            _ => ApiError::new(code, err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
