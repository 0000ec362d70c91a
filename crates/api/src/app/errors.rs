use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use partstock_core::DomainError;
use partstock_infra::{PartServiceError, StoreError};

pub fn service_error_to_response(err: PartServiceError) -> axum::response::Response {
    if err.is_client_fault() {
        tracing::debug!(error = %err, "request refused");
    } else if matches!(err, PartServiceError::Store(StoreError::Timeout(_))) {
        tracing::warn!(error = %err, "transaction timed out");
    } else {
        tracing::error!(error = %err, "part service failure");
    }

    match err {
        PartServiceError::Domain(e) => match e {
            DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
            DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
            DomainError::CircularDependency(msg) => {
                json_error(StatusCode::CONFLICT, "circular_dependency", msg)
            }
            DomainError::InvariantViolation(msg) => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "invariant_violation", msg)
            }
        },
        PartServiceError::Store(StoreError::Timeout(limit)) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "timeout",
            format!("transaction did not finish within {limit:?}"),
        ),
        PartServiceError::Store(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

/// Malformed or mistyped JSON bodies are validation failures.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use partstock_core::PartId;

    fn status_of(err: impl Into<PartServiceError>) -> StatusCode {
        service_error_to_response(err.into()).status()
    }

    #[test]
    fn client_faults_map_to_4xx() {
        assert_eq!(status_of(DomainError::validation("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(DomainError::not_found(PartId::from("ghost"))), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::circular("loop")), StatusCode::CONFLICT);
    }

    #[test]
    fn server_faults_map_to_5xx() {
        assert_eq!(status_of(DomainError::invariant("broken")), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_of(StoreError::Backend("down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(StoreError::Timeout(Duration::from_millis(50))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
