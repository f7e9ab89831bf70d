use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use eduadmin_core::DomainError;
use eduadmin_infra::jobs::{JobStoreError, OperatorError};

pub fn operator_error_to_response(err: OperatorError) -> axum::response::Response {
    let (status, code) = operator_error_code(&err);
    json_error(status, code, err.to_string())
}

/// Status and machine-readable code for an operator error.
pub fn operator_error_code(err: &OperatorError) -> (StatusCode, &'static str) {
    match err {
        OperatorError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        OperatorError::Rejected { .. } => (StatusCode::CONFLICT, "transition_rejected"),
        OperatorError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
    }
}

pub fn store_error_to_response(err: JobStoreError) -> axum::response::Response {
    match err {
        JobStoreError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job not found: {id}"))
        }
        JobStoreError::AlreadyExists(id) => {
            json_error(StatusCode::CONFLICT, "already_exists", format!("job already exists: {id}"))
        }
        JobStoreError::Storage(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
