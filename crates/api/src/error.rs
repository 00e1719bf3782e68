//! API error types with HTTP response mapping.
//!
//! Every core error maps to a stable machine-readable `code` plus a
//! human-readable `message`; conflict responses enumerate the offending
//! ticket IDs so a client can retry with an adjusted set.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use serde_json::{Value, json};
use ticket_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Reservation or state-machine error from the core.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                error_body("not_found", &message, Value::Null),
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                error_body("invalid_input", &message, Value::Null),
            ),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("internal", &message, Value::Null),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(code: &str, message: &str, detail: Value) -> Value {
    let mut error = json!({ "code": code, "message": message });
    if let (Some(error_map), Some(detail_map)) = (error.as_object_mut(), detail.as_object()) {
        for (key, value) in detail_map {
            error_map.insert(key.clone(), value.clone());
        }
    }
    json!({ "error": error })
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, Value) {
    let message = err.to_string();
    match &err {
        DomainError::Store(store_err) => store_error_to_response(store_err, &message),
        DomainError::UserNotFound(_) => (
            StatusCode::NOT_FOUND,
            error_body("user_not_found", &message, Value::Null),
        ),
        DomainError::TicketNotFound(id) => (
            StatusCode::NOT_FOUND,
            error_body("not_found", &message, json!({ "missing": [id] })),
        ),
        DomainError::NoItems => (
            StatusCode::BAD_REQUEST,
            error_body("no_items", &message, Value::Null),
        ),
        DomainError::EmptyCart => (
            StatusCode::BAD_REQUEST,
            error_body("empty_cart", &message, Value::Null),
        ),
        DomainError::Conflict { conflicting } => (
            StatusCode::CONFLICT,
            error_body("conflict", &message, json!({ "conflicting": conflicting })),
        ),
        DomainError::InsufficientAvailability {
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            error_body(
                "insufficient_availability",
                &message,
                json!({ "requested": requested, "available": available }),
            ),
        ),
        DomainError::EventRequired | DomainError::InvalidQuantity { .. } => (
            StatusCode::BAD_REQUEST,
            error_body("invalid_input", &message, Value::Null),
        ),
        DomainError::NotPayable(_) => (
            StatusCode::CONFLICT,
            error_body("not_payable", &message, Value::Null),
        ),
        DomainError::NotCancellable(_) => (
            StatusCode::CONFLICT,
            error_body("not_cancellable", &message, Value::Null),
        ),
    }
}

fn store_error_to_response(err: &StoreError, message: &str) -> (StatusCode, Value) {
    match err {
        StoreError::TicketsNotFound { missing } => (
            StatusCode::NOT_FOUND,
            error_body("tickets_not_found", message, json!({ "missing": missing })),
        ),
        StoreError::ReservationConflict { conflicting } => (
            StatusCode::CONFLICT,
            error_body("conflict", message, json!({ "conflicting": conflicting })),
        ),
        StoreError::EventNotFound(_) | StoreError::OrderNotFound(_) => (
            StatusCode::NOT_FOUND,
            error_body("not_found", message, Value::Null),
        ),
        StoreError::TransitionRefused { .. } => (
            StatusCode::CONFLICT,
            error_body("conflict", message, Value::Null),
        ),
        StoreError::DuplicateSeatLabel { .. } | StoreError::NegativePrice { .. } => (
            StatusCode::BAD_REQUEST,
            error_body("invalid_input", message, Value::Null),
        ),
        StoreError::Database(_) | StoreError::Migration(_) | StoreError::Serialization(_) => {
            tracing::error!(error = %message, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("internal", "storage failure", Value::Null),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Domain(DomainError::Store(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TicketId;

    #[test]
    fn conflict_body_lists_offending_ids() {
        let id = TicketId::new();
        let (status, body) = domain_error_to_response(DomainError::Conflict {
            conflicting: vec![id],
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "conflict");
        assert_eq!(body["error"]["conflicting"][0], id.to_string());
    }

    #[test]
    fn insufficient_availability_reports_counts() {
        let (status, body) = domain_error_to_response(DomainError::InsufficientAvailability {
            requested: 3,
            available: 1,
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "insufficient_availability");
        assert_eq!(body["error"]["requested"], 3);
        assert_eq!(body["error"]["available"], 1);
    }
}
